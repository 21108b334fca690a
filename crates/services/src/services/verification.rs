//! Checks a claim against source passages.

use std::collections::HashSet;

use notebook::{models::MAX_CITATIONS, ClaimVerification};

use super::{
    llm::LlmClient,
    text::{keywords, split_sentences},
};
use crate::ServiceError;

/// Share of the claim's terms a sentence must contain to support it.
const SUPPORT_THRESHOLD: f32 = 0.6;

pub struct ClaimVerifier {
    llm: Option<LlmClient>,
}

impl ClaimVerifier {
    pub fn new(llm: Option<LlmClient>) -> Self {
        Self { llm }
    }

    pub async fn verify(
        &self,
        claim: &str,
        sources: &str,
    ) -> Result<ClaimVerification, ServiceError> {
        let verdict = match &self.llm {
            Some(llm) => {
                let user = format!(
                    "I have this claim: {} that is allegedly supported by these sources:\n\n'''\n{}\n'''\n\n\
                     Can you please tell me whether or not this claim is truthful and, if it is, \
                     identify one to three passages in the sources specifically supporting the claim?",
                    claim, sources
                );
                llm.complete_json::<ClaimVerification>("You are a careful fact checker.", &user)
                    .await?
            }
            None => overlap_verdict(claim, sources),
        };
        tracing::debug!(
            "[VERIFY] Claim judged {}",
            if verdict.claim_is_true { "true" } else { "false" }
        );
        Ok(verdict.normalized())
    }
}

fn overlap_verdict(claim: &str, sources: &str) -> ClaimVerification {
    let terms: HashSet<String> = keywords(claim).into_iter().collect();
    if terms.is_empty() {
        return ClaimVerification {
            claim_is_true: false,
            supporting_citations: None,
        };
    }
    let citations: Vec<String> = split_sentences(sources)
        .into_iter()
        .filter(|sentence| {
            let found: HashSet<String> = keywords(sentence).into_iter().collect();
            let shared = terms.intersection(&found).count();
            shared as f32 / terms.len() as f32 >= SUPPORT_THRESHOLD
        })
        .take(MAX_CITATIONS)
        .collect();

    if citations.is_empty() {
        ClaimVerification {
            claim_is_true: false,
            supporting_citations: Some(Vec::new()),
        }
    } else {
        ClaimVerification {
            claim_is_true: true,
            supporting_citations: Some(citations),
        }
    }
}

#[cfg(test)]
mod tests {
    use notebook::models::CLAIM_FALSE_CITATION;

    use super::*;

    const SOURCES: &str = "The sky is blue on clear days. Grass is green. Snow is white.";

    #[tokio::test]
    async fn supported_claim_cites_the_source() {
        let verdict = ClaimVerifier::new(None)
            .verify("The sky is blue", SOURCES)
            .await
            .unwrap();
        assert!(verdict.claim_is_true);
        assert_eq!(
            verdict.supporting_citations,
            Some(vec!["The sky is blue on clear days.".to_string()])
        );
    }

    #[tokio::test]
    async fn unsupported_claim_carries_the_false_citation() {
        let verdict = ClaimVerifier::new(None)
            .verify("The moon is made of cheese", SOURCES)
            .await
            .unwrap();
        assert!(!verdict.claim_is_true);
        assert_eq!(
            verdict.supporting_citations,
            Some(vec![CLAIM_FALSE_CITATION.to_string()])
        );
    }
}
