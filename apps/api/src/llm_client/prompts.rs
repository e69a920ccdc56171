// Prompt constants for the resume enhancement call.

/// System prompt for every enhancement request.
pub const RESUME_ENHANCER_SYSTEM: &str = "You are a professional resume enhancer. \
    Analyze the resume and provide specific improvements to make it more attractive to employers.";

/// User prompt template. `{resume_text}` is replaced with the extracted resume.
pub const RESUME_ENHANCER_PROMPT: &str = "Enhance this resume. {resume_text}";

/// Output bound for an enhancement response.
pub const RESUME_ENHANCER_MAX_TOKENS: u32 = 2000;

pub fn build_enhance_prompt(resume_text: &str) -> String {
    RESUME_ENHANCER_PROMPT.replace("{resume_text}", resume_text)
}
