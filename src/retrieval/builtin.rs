//! Built-in reference corpora for a medical practice front desk.

/// Practice policies, in retrieval tie-break order.
pub const POLICIES: &[(&str, &str)] = &[
    (
        "privacy",
        "Patient Privacy Policy:\n\
         - All patient information is confidential and protected under HIPAA\n\
         - Access to medical records requires patient consent\n\
         - Data sharing with third parties is strictly regulated",
    ),
    (
        "appointments",
        "Appointment Policy:\n\
         - 24-hour notice required for cancellations\n\
         - Telehealth options available for eligible consultations\n\
         - Emergency cases prioritized based on severity",
    ),
    (
        "insurance",
        "Insurance Policy:\n\
         - We accept major insurance providers\n\
         - Pre-authorization required for specific procedures\n\
         - Co-pay due at time of service",
    ),
    (
        "medication",
        "Medication Policy:\n\
         - Prescription refills require 48-hour notice\n\
         - Controlled substances have strict monitoring protocols\n\
         - Generic alternatives offered when available",
    ),
];

/// Past emails paired with the reply that was sent.
pub const EXAMPLES: &[(&str, &str)] = &[
    (
        "medical_records",
        "ORIGINAL EMAIL:\n\
         Hey there, I was hoping to get my medical records. What do I need to do?\n\n\
         MY RESPONSE:\n\
         Hi! Happy to help you get those records. We just need a few quick things:\n\
         1. Your signed consent (we'll send you the form)\n\
         2. A short request form\n\
         3. Your ID\n\
         Upload everything to our secure portal and we'll take care of the rest!",
    ),
    (
        "insurance_verification",
        "ORIGINAL EMAIL:\n\
         Quick question - do you take Aetna insurance?\n\n\
         MY RESPONSE:\n\
         Hey there! Yes, we work with Aetna and most other major insurance companies.\n\
         Could you send me your member ID and group number?\n\
         I'll double-check everything and get back to you within a day.",
    ),
    (
        "appointment_scheduling",
        "ORIGINAL EMAIL:\n\
         Something came up and I need to move my appointment. Help!\n\n\
         MY RESPONSE:\n\
         No worries at all, life happens!\n\
         I have a couple of spots open: Tuesday at 2pm or Wednesday at 10am.\n\
         Let me know what works better and I'll switch it right away.",
    ),
    (
        "medication_refill",
        "ORIGINAL EMAIL:\n\
         Running low on my meds - need a refill asap!\n\n\
         MY RESPONSE:\n\
         Thanks for the heads up about your meds. Here's what happens next:\n\
         1. We review your refill request today\n\
         2. We call your pharmacy\n\
         3. It should be ready in 1-2 days\n\
         Need it sooner? Just let me know!",
    ),
    (
        "late_delivery",
        "ORIGINAL EMAIL:\n\
         I haven't received my order yet and it's been 2 weeks. This is unacceptable.\n\n\
         MY RESPONSE:\n\
         I sincerely apologize for the delay. Your package is currently in transit.\n\
         I'll expedite it and send you updated tracking information within the hour.",
    ),
    (
        "refund_request",
        "ORIGINAL EMAIL:\n\
         The product I received is damaged. I want my money back immediately.\n\n\
         MY RESPONSE:\n\
         I'm very sorry to hear about the damaged product.\n\
         I've started a refund which will be processed within 2-3 business days.\n\
         Would you like a return shipping label for the damaged item?",
    ),
    (
        "product_inquiry",
        "ORIGINAL EMAIL:\n\
         Does this come in different sizes? And what colors are available?\n\n\
         MY RESPONSE:\n\
         Thanks for your interest! It comes in S, M, L and XL,\n\
         in navy blue, forest green and charcoal gray.",
    ),
    (
        "technical_support",
        "ORIGINAL EMAIL:\n\
         The software keeps crashing when I try to export my project.\n\n\
         MY RESPONSE:\n\
         Sorry about the trouble. Please clear your cache and restart the application.\n\
         If that doesn't help, send me your error log from Settings > Help > Export Log.",
    ),
];
