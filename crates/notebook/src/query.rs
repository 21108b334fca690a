//! Question answering over processed documents via *answer-query*.

use tool_client::{AnswerPayload, AnswerQuery, AnswerQueryArgs, ToolFailure, ToolInvoker};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    /// The host ran the query but found nothing to answer with.
    #[error("no answer found: {0}")]
    NoAnswerFound(String),
    #[error(transparent)]
    Tool(#[from] ToolFailure),
}

pub async fn answer_question(
    tools: &dyn ToolInvoker,
    question: &str,
) -> Result<String, QueryError> {
    let args = AnswerQueryArgs {
        question: question.to_string(),
    };
    match tool_client::call::<AnswerQuery>(tools, &args).await? {
        AnswerPayload::Answered { answer } => Ok(answer),
        AnswerPayload::NoAnswer { message } => Err(QueryError::NoAnswerFound(message)),
    }
}
