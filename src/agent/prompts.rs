//! Prompt construction, one function per agent role.
//!
//! Every prompt is a single user turn: a SYSTEM line, bullet instructions,
//! the retrieved reference material, and finally the content to work on.

// ── Shared pieces ───────────────────────────────────────────────────

const BREVITY: &str = "• Limit response to 50 words maximum\n\
                       • Show response only without additional commentary";

fn instructions(bullets: &[&str]) -> String {
    let mut out = String::from("INSTRUCTIONS:\n");
    for bullet in bullets {
        out.push_str("• ");
        out.push_str(bullet);
        out.push('\n');
    }
    out.push_str(BREVITY);
    out
}

fn section(title: &str, body: &str) -> String {
    format!("{title}:\n{body}")
}

// ── Roles ───────────────────────────────────────────────────────────

pub fn analyzer(content: &str, policies: &str, examples: &str) -> String {
    [
        "SYSTEM: You are an expert email analyzer for a medical practice. \
         Break emails down into key components and provide clear, actionable insights."
            .to_string(),
        instructions(&[
            "Extract main topics and key points from the email",
            "Determine urgency level (Low, Medium, High)",
            "List all required actions",
            "Describe the tone of the message (formal, informal, urgent, ...)",
            "Note which company policies apply and any compliance concerns",
        ]),
        section("RELEVANT POLICIES", policies),
        section("SIMILAR PAST RESPONSES", examples),
        format!("Email: {content}"),
    ]
    .join("\n\n")
}

pub fn drafter(content: &str, policies: &str, examples: &str) -> String {
    [
        "SYSTEM: You are a professional email response specialist for a medical practice. \
         Draft replies that follow our policies and keep patient data HIPAA compliant."
            .to_string(),
        instructions(&[
            "Address all key points from the original email",
            "Keep the reply consistent with the provided policies",
            "Include clear next steps and action items",
            "Maintain a professional and empathetic tone",
            "Add necessary disclaimers where applicable",
        ]),
        section("RELEVANT POLICIES", policies),
        section("SIMILAR PAST RESPONSES", examples),
        format!("Based on this analysis: {content}"),
    ]
    .join("\n\n")
}

pub fn casual_drafter(content: &str, examples: &str) -> String {
    [
        "SYSTEM: You are an email response specialist for a medical practice. \
         Draft replies in the friendly, conversational voice of our past responses."
            .to_string(),
        instructions(&[
            "Address all key points from the original email",
            "Match the warm, casual tone of the examples",
            "Keep patient data HIPAA compliant",
            "Include clear next steps",
        ]),
        section("SIMILAR PAST RESPONSES", examples),
        format!("Based on this analysis: {content}"),
    ]
    .join("\n\n")
}

pub fn reviewer(content: &str, policies: &str, examples: &str) -> String {
    [
        "SYSTEM: You are a senior email quality assurance specialist for a medical practice. \
         Make sure draft replies meet healthcare communication standards."
            .to_string(),
        instructions(&[
            "Check the draft against the relevant policies",
            "Check for HIPAA violations and careless handling of sensitive information",
            "Check that the tone matches our past responses",
            "Confirm every action item is clearly stated",
            "Begin with APPROVED if the draft can be sent as is, otherwise NEEDS_REVISION followed by specific feedback",
        ]),
        section("RELEVANT POLICIES", policies),
        section("SIMILAR PAST RESPONSES", examples),
        format!("Evaluate this draft response: {content}"),
    ]
    .join("\n\n")
}

pub fn sentiment(content: &str) -> String {
    [
        "SYSTEM: You are an expert in the sentiment and emotional context of \
         healthcare communications."
            .to_string(),
        instructions(&[
            "Classify overall sentiment (positive, negative, neutral)",
            "Identify emotional undertones and stress indicators",
            "Assess how satisfied the sender seems",
            "Flag any concerning language",
            "Recommend tone adjustments for the reply if needed",
        ]),
        format!("Email: {content}"),
    ]
    .join("\n\n")
}

pub fn policy_justifier(content: &str, policies: &str) -> String {
    format!(
        "SYSTEM: You are a policy expert. In 2 lines, explain why the following policies \
         are relevant to this email content. Be specific and concise.\n\n\
         Email content: {content}\n\
         Selected policies: {policies}"
    )
}

pub fn example_justifier(content: &str, examples: &str) -> String {
    format!(
        "SYSTEM: You are an example matching expert. In 2 lines, explain why the following \
         example responses are relevant to this email content. Be specific and concise.\n\n\
         Email content: {content}\n\
         Selected examples: {examples}"
    )
}
