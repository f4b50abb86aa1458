//! # Deterministic Keyword Models
//!
//! Dependency-free implementations of the inference traits, driven by word
//! lexicons and token overlap. Deterministic for a given input, which is what
//! makes the engine's aggregation-idempotence guarantee testable end to end.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};

use super::{
    InferenceError, LabelScore, LabelScorer, SentimentModel, TopicDiscovery, TopicInfo, TopicModel,
};
use crate::constants::OUTLIER_TOPIC_ID;

const POSITIVE_WORDS: [&str; 14] = [
    "great",
    "good",
    "excellent",
    "love",
    "loved",
    "perfect",
    "amazing",
    "wonderful",
    "comfortable",
    "happy",
    "best",
    "nice",
    "recommend",
    "soft",
];

const NEGATIVE_WORDS: [&str; 14] = [
    "bad",
    "poor",
    "terrible",
    "awful",
    "hate",
    "hated",
    "broken",
    "damaged",
    "slow",
    "disappointing",
    "worst",
    "uncomfortable",
    "returned",
    "itchy",
];

/// Check if word is a stopword
fn is_stopword(word: &str) -> bool {
    matches!(
        word,
        "the"
            | "and"
            | "for"
            | "that"
            | "this"
            | "with"
            | "from"
            | "have"
            | "has"
            | "are"
            | "was"
            | "were"
            | "been"
            | "very"
            | "they"
            | "but"
            | "not"
    )
}

/// Lowercased alphanumeric tokens, short words and stopwords dropped.
fn significant_tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.len() > 2)
        .map(str::to_lowercase)
        .filter(|word| !is_stopword(word))
        .collect()
}

/// Sentiment by lexicon vote: `POSITIVE`, `NEGATIVE`, or `NEUTRAL` on a tie
/// or when no lexicon word appears.
#[derive(Debug, Clone, Default)]
pub struct LexiconSentimentModel;

impl LexiconSentimentModel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SentimentModel for LexiconSentimentModel {
    async fn classify(&self, text: &str) -> Result<String, InferenceError> {
        let mut positive = 0usize;
        let mut negative = 0usize;
        for token in significant_tokens(text) {
            if POSITIVE_WORDS.contains(&token.as_str()) {
                positive += 1;
            } else if NEGATIVE_WORDS.contains(&token.as_str()) {
                negative += 1;
            }
        }
        let label = match positive.cmp(&negative) {
            std::cmp::Ordering::Greater => "POSITIVE",
            std::cmp::Ordering::Less => "NEGATIVE",
            std::cmp::Ordering::Equal => "NEUTRAL",
        };
        Ok(label.to_string())
    }
}

/// Scores a label by the fraction of its significant tokens present in the
/// text. Ties break on label name so the ordering is stable.
#[derive(Debug, Clone, Default)]
pub struct KeywordLabelScorer;

impl KeywordLabelScorer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LabelScorer for KeywordLabelScorer {
    async fn score(
        &self,
        text: &str,
        labels: &[String],
    ) -> Result<Vec<LabelScore>, InferenceError> {
        let text_tokens: HashSet<String> = significant_tokens(text).into_iter().collect();

        let mut scored: Vec<LabelScore> = labels
            .iter()
            .map(|label| {
                let label_tokens = significant_tokens(label);
                let score = if label_tokens.is_empty() {
                    0.0
                } else {
                    let matched = label_tokens
                        .iter()
                        .filter(|token| text_tokens.contains(*token))
                        .count();
                    matched as f64 / label_tokens.len() as f64
                };
                LabelScore {
                    label: label.clone(),
                    score,
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.label.cmp(&b.label))
        });
        Ok(scored)
    }
}

/// Corpus topic discovery by dominant-keyword grouping.
///
/// Each document is keyed by its most frequent significant token; documents
/// sharing a key form a cluster when the group reaches `min_cluster_size`.
/// Everything else is an outlier. All tie-breaks are lexicographic, so the
/// same corpus always yields the same clusters in the same order.
#[derive(Debug, Clone)]
pub struct KeywordTopicModel {
    min_cluster_size: usize,
}

impl Default for KeywordTopicModel {
    fn default() -> Self {
        Self {
            min_cluster_size: 2,
        }
    }
}

impl KeywordTopicModel {
    pub fn new(min_cluster_size: usize) -> Self {
        Self {
            min_cluster_size: min_cluster_size.max(1),
        }
    }

    /// Most frequent significant token of one document.
    fn dominant_token(doc: &str) -> Option<String> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for token in significant_tokens(doc) {
            *counts.entry(token).or_insert(0) += 1;
        }
        // Equal counts resolve to the lexicographically smallest token
        counts
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
            .map(|(token, _)| token)
    }

    fn keywords_for(docs: &[String], members: &[usize], limit: usize) -> Vec<String> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for &index in members {
            for token in significant_tokens(&docs[index]) {
                *counts.entry(token).or_insert(0) += 1;
            }
        }
        let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
            .into_iter()
            .take(limit)
            .map(|(token, _)| token)
            .collect()
    }
}

#[async_trait]
impl TopicModel for KeywordTopicModel {
    async fn discover(&self, docs: &[String]) -> Result<TopicDiscovery, InferenceError> {
        let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (index, doc) in docs.iter().enumerate() {
            if let Some(token) = Self::dominant_token(doc) {
                groups.entry(token).or_default().push(index);
            }
        }

        let mut clusters: Vec<(String, Vec<usize>)> = groups
            .into_iter()
            .filter(|(_, members)| members.len() >= self.min_cluster_size)
            .collect();
        clusters.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(&b.0)));

        let mut assignments = vec![OUTLIER_TOPIC_ID; docs.len()];
        let mut topics = Vec::with_capacity(clusters.len());
        for (topic_id, (_, members)) in clusters.into_iter().enumerate() {
            let topic_id = topic_id as i64;
            for &index in &members {
                assignments[index] = topic_id;
            }
            let keywords = Self::keywords_for(docs, &members, 5);
            let label = {
                let head: Vec<&str> = keywords.iter().take(3).map(String::as_str).collect();
                format!("{}_{}", topic_id, head.join("_"))
            };
            topics.push(TopicInfo {
                topic_id,
                label,
                keywords,
                size: members.len() as u64,
            });
        }

        Ok(TopicDiscovery {
            assignments,
            topics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sentiment_lexicon_vote() {
        let model = LexiconSentimentModel::new();
        assert_eq!(
            model.classify("great quality, love the fit").await.unwrap(),
            "POSITIVE"
        );
        assert_eq!(
            model.classify("terrible, arrived broken").await.unwrap(),
            "NEGATIVE"
        );
        assert_eq!(model.classify("it is a shirt").await.unwrap(), "NEUTRAL");
        assert_eq!(model.classify("").await.unwrap(), "NEUTRAL");
    }

    #[tokio::test]
    async fn test_scorer_orders_by_overlap() {
        let scorer = KeywordLabelScorer::new();
        let labels = vec![
            "slow delivery".to_string(),
            "fast delivery".to_string(),
            "price".to_string(),
        ];
        let scored = scorer
            .score("the delivery was slow and late", &labels)
            .await
            .unwrap();

        assert_eq!(scored[0].label, "slow delivery");
        assert_eq!(scored[0].score, 1.0);
        assert_eq!(scored[1].label, "fast delivery");
        assert_eq!(scored[1].score, 0.5);
        assert_eq!(scored[2].score, 0.0);
    }

    #[tokio::test]
    async fn test_scorer_scores_stay_in_unit_range() {
        let scorer = KeywordLabelScorer::new();
        let labels = vec!["good quality fabric".to_string()];
        let scored = scorer.score("good good good", &labels).await.unwrap();
        assert!(scored[0].score >= 0.0 && scored[0].score <= 1.0);
    }

    #[tokio::test]
    async fn test_topic_model_groups_by_dominant_keyword() {
        let model = KeywordTopicModel::default();
        let docs: Vec<String> = [
            "shipping took forever, shipping was slow",
            "shipping box arrived late",
            "fabric feels scratchy",
            "fabric pills after one wash",
            "completely unrelated gibberish zzz",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();

        let discovery = model.discover(&docs).await.unwrap();
        assert_eq!(discovery.assignments.len(), 5);
        // Two clusters of two, the singleton is an outlier
        assert_eq!(discovery.topics.len(), 2);
        assert_eq!(discovery.assignments[0], discovery.assignments[1]);
        assert_eq!(discovery.assignments[2], discovery.assignments[3]);
        assert_ne!(discovery.assignments[0], discovery.assignments[2]);
        assert_eq!(discovery.assignments[4], OUTLIER_TOPIC_ID);

        let shipping_topic = &discovery.topics[0];
        assert_eq!(shipping_topic.size, 2);
        assert!(shipping_topic.keywords.contains(&"shipping".to_string()));
    }

    #[tokio::test]
    async fn test_topic_model_is_deterministic() {
        let model = KeywordTopicModel::default();
        let docs: Vec<String> = [
            "price price price",
            "price too high",
            "quality is quality",
            "quality dropped",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();

        let first = model.discover(&docs).await.unwrap();
        let second = model.discover(&docs).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_topic_model_empty_corpus() {
        let model = KeywordTopicModel::default();
        let discovery = model.discover(&[]).await.unwrap();
        assert!(discovery.assignments.is_empty());
        assert!(discovery.topics.is_empty());
    }

    #[tokio::test]
    async fn test_topic_label_carries_id_and_keywords() {
        let model = KeywordTopicModel::default();
        let docs: Vec<String> = ["delivery late delivery", "delivery lost"]
            .iter()
            .map(ToString::to_string)
            .collect();

        let discovery = model.discover(&docs).await.unwrap();
        assert_eq!(discovery.topics.len(), 1);
        assert!(discovery.topics[0].label.starts_with("0_delivery"));
    }
}
