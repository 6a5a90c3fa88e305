// Prompt constants for the interview evaluator.
// Templates use `{placeholder}` markers replaced before sending.

/// System prompt shared by the JSON-returning evaluator calls.
pub const EVALUATOR_JSON_SYSTEM: &str = "You are a senior technical interviewer for a \
    Full Stack Developer (React/Node.js) position. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON value. \
    Do NOT use markdown code fences.";

pub const SUMMARY_SYSTEM: &str = "You are a senior technical interviewer writing a concise, \
    professional and constructive assessment of a candidate. Plain text, no markdown headings.";

/// Replace `{name}` and `{email}`.
pub const QUESTION_SET_PROMPT: &str = r#"Generate 6 interview questions for a Full Stack Developer (React/Node.js) position, tailored to this candidate.

Candidate:
- Name: {name}
- Email: {email}

Rules:
- Exactly 6 questions, in this order: 2 Easy, 2 Medium, 2 Hard.
- Easy questions are answerable in 20 seconds, Medium in 60 seconds, Hard in 120 seconds.
- Cover React fundamentals and hooks, Node.js and Express, database concepts,
  system design (Hard only) and problem solving.
- Test both theoretical knowledge and practical skill.

Return a JSON array with this EXACT schema:
[
  {"id": "q1", "prompt": "Question text", "difficulty": "Easy", "category": "React"}
]"#;

/// Replace `{question}`, `{answer}`, `{time_spent}` and `{time_limit}`.
pub const EVALUATE_ANSWER_PROMPT: &str = r#"Evaluate this interview answer on a scale of 0-100.

Question: {question}
Answer: {answer}
Time spent: {time_spent} seconds (out of {time_limit} seconds allowed)

Criteria:
- Technical accuracy (40%)
- Completeness (30%)
- Communication clarity (20%)
- Time management (10%)

Return a JSON object with this EXACT schema:
{"score": 85, "feedback": "Two or three sentences of feedback."}"#;

/// Replace `{total_score}`, `{max_score}` and `{transcript}`.
pub const SUMMARY_PROMPT: &str = r#"Write an interview summary for this candidate.

Total score: {total_score}/{max_score}
Questions and answers:
{transcript}

Cover:
1. Overall performance
2. Strengths
3. Areas for improvement
4. Recommendation (Hire / Consider / Reject)

Maximum 200 words."#;
