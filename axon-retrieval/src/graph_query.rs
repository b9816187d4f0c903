//! `graph_query` — natural-language-to-structured-query against the
//! property graph (spec §4.5).
//!
//! Pipeline: a model generates a candidate query from the schema and the
//! question; the text is normalized, validated for read-only safety, and
//! auto-bounded with a `LIMIT`; on validation failure or a syntax-class
//! execution error, one repair turn is attempted before giving up. The
//! safety layer assumes the generator is adversarial (spec §6 "Structured-
//! query language surface") — it never trusts the model's output, repaired
//! or not.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use axon_core::error::StoreError;
use axon_core::store::{GraphRow, GraphStore};
use axon_tool::registry::{ToolDyn, ToolError};
use axon_turn::{ChatModel, ContentPart, ProviderMessage, ProviderRequest, Role};

/// The schema block handed to the model alongside the question, describing
/// the labeled property graph it may query (spec §6 `GraphStore`).
pub const GRAPH_SCHEMA_BLOCK: &str = "\
Nodes: (:Entity {entity_id, name, type, description, aliases}) additionally labeled with one of \
Algorithm, DataStructure, Concept, Problem, Technique; (:User {user_id}).
Relationships: PREREQ, VARIANT_OF, IMPROVES, USES, APPLIES_TO, BELONGS_TO, RELATED_TO between \
entities; MASTERED, WEAK_AT, INTERESTED_IN between a User and an entity.
Only read operations are permitted: MATCH, OPTIONAL MATCH, WITH, UNWIND, RETURN. Every query must \
end in a RETURN clause.";

const WRITE_KEYWORDS: &[&str] =
    &["CREATE", "MERGE", "DELETE", "DETACH", "SET", "REMOVE", "DROP", "CALL", "LOAD CSV", "FOREACH"];
const ALLOWED_FIRST_KEYWORDS: &[&str] = &["MATCH", "OPTIONAL", "WITH", "UNWIND", "RETURN"];

const REJECTION_MESSAGE: &str = "Query rejected: only read operations are allowed.";
const GENERIC_FAILURE_MESSAGE: &str = "Sorry, I couldn't look that up in the knowledge graph right now.";

static LINE_COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"//[^\n]*").unwrap());
static BLOCK_COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());
static LANGUAGE_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(cypher|cql|query)\s*:?\s*$").unwrap());
static LIMIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bLIMIT\s+\d+\b").unwrap());
static RETURN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bRETURN\b").unwrap());

fn word_re(keyword: &str) -> Regex {
    // `LOAD CSV` contains a space; treat it as a literal phrase with word
    // boundaries on either side rather than a single `\b...\b` token.
    let escaped = regex::escape(keyword).replace(' ', r"\s+");
    Regex::new(&format!(r"(?i)\b{escaped}\b")).expect("keyword pattern is always valid")
}

/// The specific issue found while validating a generated query, carried
/// into the one-shot repair prompt (spec §4.5 step 6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryIssue {
    /// A write/effect keyword, or an `apoc.` call, was present.
    UnsafeKeyword(String),
    /// The first keyword wasn't one of the allowed read-only verbs.
    BadFirstKeyword,
    /// No `RETURN` clause was found.
    MissingReturn,
}

impl QueryIssue {
    /// Human-readable description fed back to the model in the repair
    /// prompt (spec §4.5 step 6: "unsafe keyword detected", "missing RETURN
    /// clause").
    pub fn description(&self) -> String {
        match self {
            QueryIssue::UnsafeKeyword(kw) => format!("unsafe keyword detected: {kw}"),
            QueryIssue::BadFirstKeyword => {
                "query must begin with one of MATCH, OPTIONAL, WITH, UNWIND, RETURN".to_string()
            }
            QueryIssue::MissingReturn => "missing RETURN clause".to_string(),
        }
    }

    /// Whether this issue is the specific "wrote something unsafe" class,
    /// which is never retried (spec §4.5 "Unsafe-keyword rejection ... is
    /// never retried further").
    pub fn is_unsafe(&self) -> bool {
        matches!(self, QueryIssue::UnsafeKeyword(_))
    }
}

/// Strip `//` line comments and `/* ... */` block comments.
fn strip_comments(query: &str) -> String {
    let no_block = BLOCK_COMMENT_RE.replace_all(query, "");
    LINE_COMMENT_RE.replace_all(&no_block, "").to_string()
}

/// Normalize a model's raw candidate query (spec §4.5 step 2): strip code
/// fences, drop a leading standalone language-tag line, and fix the
/// observed "CH" truncation of "MATCH".
pub fn normalize_query(raw: &str) -> String {
    let mut text = raw.trim();
    if let Some(fenced) = text.strip_prefix("```") {
        let body = match fenced.find('\n') {
            Some(nl) => &fenced[nl + 1..],
            None => fenced,
        };
        text = body.strip_suffix("```").unwrap_or(body).trim();
    }

    let mut lines: Vec<&str> = text.lines().collect();
    if let Some(first) = lines.first() {
        if LANGUAGE_TAG_RE.is_match(first.trim()) {
            lines.remove(0);
        }
    }
    let mut normalized = lines.join("\n").trim().to_string();

    let first_token = normalized.split_whitespace().next().unwrap_or("").to_uppercase();
    if first_token == "CH" {
        normalized = normalized.replacen("CH", "MATCH", 1);
    }
    normalized
}

/// Validate a normalized query for read-only safety (spec §4.5 step 3).
/// Operates on the comment-stripped text; the caller is responsible for
/// using the *stripped* text for bounding/execution too, per spec §8
/// "the text (post comment-strip) contains no forbidden keyword ... a
/// RETURN and a LIMIT".
pub fn validate_query(stripped: &str) -> Result<(), QueryIssue> {
    if stripped.to_lowercase().contains("apoc.") {
        return Err(QueryIssue::UnsafeKeyword("apoc.".to_string()));
    }
    for kw in WRITE_KEYWORDS {
        if word_re(kw).is_match(stripped) {
            return Err(QueryIssue::UnsafeKeyword((*kw).to_string()));
        }
    }
    let first_token = stripped.split_whitespace().next().unwrap_or("").to_uppercase();
    if !ALLOWED_FIRST_KEYWORDS.contains(&first_token.as_str()) {
        return Err(QueryIssue::BadFirstKeyword);
    }
    if !RETURN_RE.is_match(stripped) {
        return Err(QueryIssue::MissingReturn);
    }
    Ok(())
}

/// Append `LIMIT 50` if no `LIMIT` clause is present (spec §4.5 step 4).
pub fn bound_query(stripped: &str) -> String {
    if LIMIT_RE.is_match(stripped) {
        stripped.to_string()
    } else {
        format!("{} LIMIT 50", stripped.trim_end())
    }
}

/// Format structured-query rows as `key: value, key2: value2` lines, one
/// per row (spec scenario 3: the formatted result must contain `name: BFS`
/// and `type: Algorithm` as literal substrings).
fn format_rows(rows: &[GraphRow]) -> String {
    if rows.is_empty() {
        return "No matching rows found.".to_string();
    }
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let mut keys: Vec<&String> = row.keys().collect();
            keys.sort();
            let fields = keys
                .into_iter()
                .map(|k| format!("{k}: {}", render_value(&row[k])))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{}. {fields}", i + 1)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn build_generate_request(question: &str) -> ProviderRequest {
    let system = format!(
        "You translate a tutoring question into a single read-only Cypher-style query against the \
         following property graph schema. Respond with ONLY the query text, no prose, no explanation.\n\n{GRAPH_SCHEMA_BLOCK}"
    );
    bare_request(system, question.to_string())
}

fn build_repair_request(question: &str, broken_query: &str, issue: &str) -> ProviderRequest {
    let system = format!(
        "Your previous query was rejected. Schema:\n{GRAPH_SCHEMA_BLOCK}\n\n\
         Original question: {question}\n\nBroken query:\n{broken_query}\n\nIssue: {issue}\n\n\
         Respond with ONLY a corrected read-only query, no prose."
    );
    bare_request(system, "Provide the corrected query.".to_string())
}

fn bare_request(system: String, user: String) -> ProviderRequest {
    ProviderRequest {
        model: None,
        messages: vec![ProviderMessage { role: Role::User, content: vec![ContentPart::Text { text: user }] }],
        tools: Vec::new(),
        max_tokens: None,
        temperature: None,
        system: Some(system),
        timeout: None,
        extra: Value::Null,
    }
}

async fn complete_text(model: &dyn ChatModel, request: ProviderRequest) -> Result<String, ToolError> {
    model
        .complete(request)
        .await
        .map(|r| r.text())
        .map_err(|e| ToolError::ExecutionFailed(e.to_string()))
}

/// The natural-language-to-structured-query tool (spec §4.5/§6).
pub struct GraphQueryTool {
    model: Arc<dyn ChatModel>,
    store: Arc<dyn GraphStore>,
}

impl GraphQueryTool {
    /// Build the tool over a generation model and the graph store it
    /// queries.
    pub fn new(model: Arc<dyn ChatModel>, store: Arc<dyn GraphStore>) -> Self {
        Self { model, store }
    }

    /// Run the full generate/normalize/validate/bound/execute pipeline for
    /// one natural-language `question`, with one repair attempt on
    /// validation or syntax-class execution failure.
    pub async fn query(&self, question: &str) -> Result<String, ToolError> {
        let raw = complete_text(self.model.as_ref(), build_generate_request(question)).await?;
        match self.run_once(question, &raw).await {
            Outcome::Ok(text) => Ok(text),
            Outcome::Rejected => Ok(REJECTION_MESSAGE.to_string()),
            Outcome::Retry { broken, issue } => {
                let repaired =
                    complete_text(self.model.as_ref(), build_repair_request(question, &broken, &issue)).await?;
                match self.run_once(question, &repaired).await {
                    Outcome::Ok(text) => Ok(text),
                    Outcome::Rejected => Ok(REJECTION_MESSAGE.to_string()),
                    Outcome::Retry { .. } => Ok(GENERIC_FAILURE_MESSAGE.to_string()),
                }
            }
        }
    }

    async fn run_once(&self, _question: &str, raw: &str) -> Outcome {
        let normalized = normalize_query(raw);
        let stripped = strip_comments(&normalized);
        if let Err(issue) = validate_query(stripped.trim()) {
            return if issue.is_unsafe() {
                Outcome::Rejected
            } else {
                Outcome::Retry { broken: normalized, issue: issue.description() }
            };
        }
        let bounded = bound_query(stripped.trim());
        match self.store.query_structured(&bounded, HashMap::new()).await {
            Ok(rows) => Outcome::Ok(format_rows(&rows)),
            Err(StoreError::NonRetryable(msg)) => Outcome::Retry { broken: normalized, issue: msg },
            Err(other) => Outcome::Retry { broken: normalized, issue: other.to_string() },
        }
    }
}

enum Outcome {
    Ok(String),
    Rejected,
    Retry { broken: String, issue: String },
}

#[async_trait]
impl ToolDyn for GraphQueryTool {
    fn name(&self) -> &str {
        "graph_query"
    }

    fn description(&self) -> &str {
        "Natural-language query over the knowledge graph of algorithms, data structures, and their \
         relationships. Input: a question in plain language; it is translated into a read-only \
         structured query for you."
    }

    async fn call(&self, input: &str) -> Result<String, ToolError> {
        let question = input.trim();
        if question.is_empty() {
            return Err(ToolError::InvalidInput("question text must not be empty".into()));
        }
        self.query(question).await
    }
}
