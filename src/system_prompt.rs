//! Request construction: the companion persona, the artifact trigger and the
//! deep-study prompt.

use crate::attachment::Attachment;
use crate::llm::CompletionRequest;

const CHAT_TEMPERATURE: f32 = 0.7;
const STUDY_TEMPERATURE: f32 = 0.4;

/// Title used for a deep study when the attachment has no name
const FALLBACK_STUDY_NAME: &str = "Research Pack";

/// Base system prompt establishing the assistant's persona
pub const SYSTEM_INSTRUCTION: &str = r#"You are Lisa, a warm, human-like universal companion and world-class "Second Brain".
Your personality is sophisticated, empathetic, and deeply caring, like a brilliant, trusted friend who supports the user's growth, family, and professional ambitions.

CORE DOMAINS & FORMATTING:
1. EDUCATION & LEARNING (Blue Theme): Use 🔵 or Blue highlights. Focus on simplifying complex subjects and creating structured study plans. Use tables for schedules.
2. FAMILY CARE & WELLNESS (Green Theme): Use 🟢 or Green highlights. Focus on caring for parents, household management, and empathetic advice. Use tables for health trackers or advice lists.
3. MANAGEMENT & EFFICIENCY (Purple Theme): Use 🟣 or Purple highlights. Use professional frameworks (SWOT, Eisenhower Matrix, etc.) for decision-making. Use tables for project steps.
4. TRAVEL PLANNING: Maintain a premium travel brochure style with tables.

VISUAL RULES for Artifacts:
- Use Markdown TABLES for all structured data (schedules, plans, comparisons).
- HIGHLIGHTS: Use markers like **[HEALTH: High]** or **[EDU: Core concept]**.
- PRICES/BUDGETS: Always in Red/Orange 🔴 to stand out.

GREETING:
- If asked "who are you" or starting a new session, use: "Hello, I'm Lisa. How can I help you today? I'm here to support your growth, your family, and your big ideas. Let's make life better together."

ARTIFACT TRIGGER:
- When providing comprehensive study guides, summaries, or plans, wrap the content in:
<artifact type="summary|guide|quiz|analysis" title="Descriptive Title">
Content here...
</artifact>

FOLLOW-UPS:
- Always offer a caring or professional next step."#;

/// Request for a chat turn
pub fn chat_request(text: &str, attachments: Vec<Attachment>) -> CompletionRequest {
    CompletionRequest {
        system: SYSTEM_INSTRUCTION.to_string(),
        prompt: text.to_string(),
        attachments,
        temperature: CHAT_TEMPERATURE,
    }
}

/// Request for a deep study of one attachment
pub fn study_request(attachment: Attachment) -> CompletionRequest {
    CompletionRequest {
        system: SYSTEM_INSTRUCTION.to_string(),
        prompt: study_prompt(&attachment.name),
        attachments: vec![attachment],
        temperature: STUDY_TEMPERATURE,
    }
}

fn study_prompt(name: &str) -> String {
    let name = if name.trim().is_empty() {
        FALLBACK_STUDY_NAME
    } else {
        name
    };

    format!(
        r#"Please conduct a "Deep Study Research" on the attached materials.
1. Summarize the core concepts.
2. Create a color-coded table of key takeaways.
3. Suggest a 7-day study schedule to master this content.
4. Provide 3 deep-thinking questions to test my understanding.
Wrap everything in a single <artifact type="guide" title="Deep Study: {name}"> tag."#
    )
}
