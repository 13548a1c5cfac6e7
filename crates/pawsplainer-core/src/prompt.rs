/// Appended to every question so the model answers as a slideshow
pub const INSTRUCTIONS: &str = "
Use a fun story about lots of tiny dogs and puppies as a metaphor.
Keep sentences short but conversational, casual, and engaging.
Generate a cute, minimal illustration for each sentence with black ink on white background.
No commentary, just begin your explanation.
Keep going until you're done.";

/// Questions offered on the start screen
pub const EXAMPLES: [&str; 3] = [
    "How does photosynthesis work?",
    "What is machine learning?",
    "Explain quantum physics",
];

pub fn build_prompt(question: &str) -> String {
    let mut prompt = String::with_capacity(question.len() + INSTRUCTIONS.len());
    prompt.push_str(question);
    prompt.push_str(INSTRUCTIONS);
    prompt
}
