//! crates/journal_core/src/analysis.rs
//!
//! The analysis-pass state machine, kept free of I/O so the service layer
//! stays thin: gap computation, the outbound request payload, the inbound
//! webhook payload, and the write-once field merge with its completion law.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::{Entry, EntryStatus};

/// Mood scores at or above this value contribute to `mood_labels`.
pub const MOOD_SIGNIFICANCE_CUTOFF: f64 = 0.5;

/// The sentinel the analysis worker emits when no goal was detected.
/// Compared case-insensitively after trimming.
pub const NO_GOAL_SENTINEL: &str = "none detected";

//=========================================================================================
// Gap Descriptor
//=========================================================================================

/// The gap descriptor: one presence bit per analysis field.
///
/// The seven analysis fields are a closed set, so this is a fixed struct
/// rather than a dynamically keyed map. Serialized with the camelCase key
/// names the analysis worker expects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisGaps {
    pub has_transcript: bool,
    pub has_summary: bool,
    pub has_tags: bool,
    pub has_mood_scores: bool,
    pub has_reflections: bool,
    pub has_suggestions: bool,
    pub has_goals: bool,
}

impl AnalysisGaps {
    /// Computes which analysis fields an entry already has.
    ///
    /// A goal equal to the "none detected" sentinel counts as absent, so a
    /// later pass gets another chance to surface one.
    pub fn of_entry(entry: &Entry) -> Self {
        Self {
            has_transcript: is_present(&entry.transcript),
            has_summary: is_present(&entry.ai_summary),
            has_tags: !entry.tags.is_empty(),
            has_mood_scores: !entry.mood_scores.is_empty(),
            has_reflections: is_present(&entry.reflections),
            has_suggestions: is_present(&entry.suggestions),
            has_goals: entry
                .goals
                .as_deref()
                .map(|g| {
                    let g = g.trim();
                    !g.is_empty() && !g.eq_ignore_ascii_case(NO_GOAL_SENTINEL)
                })
                .unwrap_or(false),
        }
    }

    /// True when no analysis work remains.
    pub fn is_complete(&self) -> bool {
        self.has_transcript
            && self.has_summary
            && self.has_tags
            && self.has_mood_scores
            && self.has_reflections
            && self.has_suggestions
            && self.has_goals
    }
}

fn is_present(field: &Option<String>) -> bool {
    field.as_deref().map(|s| !s.is_empty()).unwrap_or(false)
}

//=========================================================================================
// Outbound Request (Dispatcher -> Analysis Worker)
//=========================================================================================

/// The single outbound request the dispatcher sends to the analysis worker.
/// Wire-compatible with the worker's expected JSON shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    #[serde(flatten)]
    pub gaps: AnalysisGaps,
    /// Time-limited signed URL to the audio object, or empty when the
    /// transcript already exists and no download is needed.
    pub audio_url: String,
    /// The existing transcript ciphertext, or empty.
    pub transcript: String,
    pub user_id: String,
    pub entry_id: Uuid,
    pub is_goal_added: bool,
}

//=========================================================================================
// Inbound Payload (Analysis Worker -> Webhook Handler)
//=========================================================================================

/// The webhook body: whatever the worker produced this pass, plus an echo
/// of the dispatch metadata. Every field is optional because deliveries may
/// be malformed or duplicated; validation happens in the handler.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WebhookEnvelope {
    pub analysis: Option<AnalysisPayload>,
    pub status: Option<DispatchEcho>,
}

/// The `analysis` member is usually an object of produced fields, but the
/// worker reports an overall failure as the bare string `"failed"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AnalysisPayload {
    Verdict(String),
    Output(AnalysisOutput),
}

/// The dispatch metadata echoed back by the worker: the gap descriptor that
/// was originally sent, plus the addressing fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DispatchEcho {
    #[serde(flatten)]
    pub gaps: AnalysisGaps,
    pub user_id: Option<String>,
    pub entry_id: Option<Uuid>,
    pub is_goal_added: Option<bool>,
}

/// The analysis fields the worker managed to produce this pass. Text fields
/// arrive as ciphertext; tags and mood scores arrive in the clear.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOutput {
    pub transcript: Option<String>,
    pub ai_summary: Option<String>,
    pub tags: Option<Vec<String>>,
    pub mood_scores: Option<BTreeMap<String, f64>>,
    pub reflections: Option<String>,
    pub suggestions: Option<String>,
    pub goals: Option<String>,
}

//=========================================================================================
// Merge
//=========================================================================================

/// The staged result of one merge: only fields that were absent and newly
/// produced are `Some`. Applied to the entry row in a single update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StagedUpdate {
    pub transcript: Option<String>,
    pub ai_summary: Option<String>,
    pub tags: Option<Vec<String>>,
    pub mood_scores: Option<BTreeMap<String, f64>>,
    /// Derived from `mood_scores` at the significance cutoff whenever scores
    /// are staged, never trusted from upstream.
    pub mood_labels: Option<Vec<String>>,
    pub reflections: Option<String>,
    pub suggestions: Option<String>,
    pub goals: Option<String>,
    /// Set when a fresh goal was staged: the entry's `is_goal_added` flag is
    /// reset so the client knows the goal has not been promoted yet.
    pub reset_goal_added: bool,
    pub status: EntryStatus,
}

impl StagedUpdate {
    /// True when the update carries no field writes, only a status.
    pub fn is_status_only(&self) -> bool {
        self.transcript.is_none()
            && self.ai_summary.is_none()
            && self.tags.is_none()
            && self.mood_scores.is_none()
            && self.reflections.is_none()
            && self.suggestions.is_none()
            && self.goals.is_none()
    }

    /// Builds the live-broadcast copy of this update, decrypting the text
    /// fields through the supplied cipher closure.
    pub fn to_broadcast(&self, decrypt: impl Fn(&str) -> String) -> AnalysisBroadcast {
        AnalysisBroadcast {
            transcript: self.transcript.as_deref().map(&decrypt),
            ai_summary: self.ai_summary.as_deref().map(&decrypt),
            tags: self.tags.clone(),
            mood_scores: self.mood_scores.clone(),
            mood_labels: self.mood_labels.clone(),
            reflections: self.reflections.as_deref().map(&decrypt),
            suggestions: self.suggestions.as_deref().map(&decrypt),
            goals: self.goals.as_deref().map(&decrypt),
            is_goal_added: if self.reset_goal_added { Some(false) } else { None },
        }
    }
}

/// A merge that could not run to the end of the field list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    /// The transcript was missing and this pass did not produce one. The
    /// transcript gates every other field, so the whole pass is failed.
    #[error("transcript was required but the pass did not produce one")]
    TranscriptMissing,
}

/// Merges one analysis pass against the gap descriptor that requested it.
///
/// Fields already marked present in `gaps` are never touched (write-once per
/// field). A field that was missing and is supplied non-empty is staged; a
/// field that was missing and not supplied marks the pass incomplete. The
/// resulting status is `Completed` iff nothing remained unsupplied.
pub fn merge_pass(
    gaps: &AnalysisGaps,
    output: &AnalysisOutput,
) -> Result<StagedUpdate, MergeError> {
    let mut staged = StagedUpdate::default();
    let mut completed = true;

    // 1. Transcript. Gating: without one there is nothing to analyze.
    if !gaps.has_transcript {
        match non_empty(&output.transcript) {
            Some(text) => staged.transcript = Some(text.to_string()),
            None => return Err(MergeError::TranscriptMissing),
        }
    }

    // 2. Summary
    if !gaps.has_summary {
        match non_empty(&output.ai_summary) {
            Some(text) => staged.ai_summary = Some(text.to_string()),
            None => completed = false,
        }
    }

    // 3. Tags
    if !gaps.has_tags {
        match output.tags.as_deref().filter(|t| !t.is_empty()) {
            Some(tags) => staged.tags = Some(tags.to_vec()),
            None => completed = false,
        }
    }

    // 4. Mood scores, with the label derivation
    if !gaps.has_mood_scores {
        match output.mood_scores.as_ref().filter(|m| !m.is_empty()) {
            Some(scores) => {
                staged.mood_labels = Some(significant_moods(scores));
                staged.mood_scores = Some(scores.clone());
            }
            None => completed = false,
        }
    }

    // 5. Reflections
    if !gaps.has_reflections {
        match non_empty(&output.reflections) {
            Some(text) => staged.reflections = Some(text.to_string()),
            None => completed = false,
        }
    }

    // 6. Suggestions
    if !gaps.has_suggestions {
        match non_empty(&output.suggestions) {
            Some(text) => staged.suggestions = Some(text.to_string()),
            None => completed = false,
        }
    }

    // 7. Goals
    if !gaps.has_goals {
        match non_empty(&output.goals) {
            Some(text) => {
                staged.goals = Some(text.to_string());
                staged.reset_goal_added = true;
            }
            None => completed = false,
        }
    }

    staged.status = if completed {
        EntryStatus::Completed
    } else {
        EntryStatus::Failed
    };
    Ok(staged)
}

/// The set of mood names whose score passes the significance cutoff.
pub fn significant_moods(scores: &BTreeMap<String, f64>) -> Vec<String> {
    scores
        .iter()
        .filter(|(_, score)| **score >= MOOD_SIGNIFICANCE_CUTOFF)
        .map(|(name, _)| name.clone())
        .collect()
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

//=========================================================================================
// Live-Channel Event Payloads
//=========================================================================================

/// The decrypted copy of a staged update, pushed to subscribed clients.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisBroadcast {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood_scores: Option<BTreeMap<String, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood_labels: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflections: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goals: Option<String>,
    #[serde(rename = "isGoalAdded", skip_serializing_if = "Option::is_none")]
    pub is_goal_added: Option<bool>,
}

/// One `entry_update` event on the live status channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryUpdate {
    pub status: EntryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisBroadcast>,
}

impl EntryUpdate {
    /// A bare status transition with no field payload, used for the
    /// optimistic `processing` event and for failure notices.
    pub fn status_only(status: EntryStatus) -> Self {
        Self {
            status,
            result: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn scores(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs
            .iter()
            .map(|(name, score)| (name.to_string(), *score))
            .collect()
    }

    fn blank_entry() -> Entry {
        Entry {
            id: Uuid::new_v4(),
            user_id: "user_1".to_string(),
            title: "Untitled".to_string(),
            audio_path: "user_1/1700000000-audio.wav".to_string(),
            transcript: None,
            ai_summary: None,
            reflections: None,
            suggestions: None,
            goals: None,
            tags: Vec::new(),
            mood_scores: BTreeMap::new(),
            mood_labels: Vec::new(),
            status: EntryStatus::Processing,
            is_goal_added: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn fresh_entry_has_all_gaps() {
        let gaps = AnalysisGaps::of_entry(&blank_entry());
        assert_eq!(gaps, AnalysisGaps::default());
        assert!(!gaps.is_complete());
    }

    #[test]
    fn sentinel_goal_counts_as_absent() {
        let mut entry = blank_entry();
        entry.goals = Some("  None Detected ".to_string());
        assert!(!AnalysisGaps::of_entry(&entry).has_goals);

        entry.goals = Some("run a marathon".to_string());
        assert!(AnalysisGaps::of_entry(&entry).has_goals);
    }

    #[test]
    fn empty_strings_count_as_absent() {
        let mut entry = blank_entry();
        entry.transcript = Some(String::new());
        entry.ai_summary = Some(String::new());
        let gaps = AnalysisGaps::of_entry(&entry);
        assert!(!gaps.has_transcript);
        assert!(!gaps.has_summary);
    }

    #[test]
    fn mood_labels_are_exactly_the_scores_at_or_above_cutoff() {
        let scores = scores(&[
            ("anger", 0.1),
            ("calm", 0.5),
            ("joy", 0.8),
            ("sadness", 0.49),
        ]);
        assert_eq!(significant_moods(&scores), vec!["calm", "joy"]);
        assert!(significant_moods(&BTreeMap::new()).is_empty());
    }

    #[test]
    fn present_fields_are_never_overwritten() {
        let gaps = AnalysisGaps {
            has_transcript: true,
            has_summary: true,
            ..Default::default()
        };
        let output = AnalysisOutput {
            transcript: Some("new transcript".to_string()),
            ai_summary: Some("new summary".to_string()),
            ..Default::default()
        };
        let staged = merge_pass(&gaps, &output).unwrap();
        assert!(staged.transcript.is_none());
        assert!(staged.ai_summary.is_none());
        assert_eq!(staged.status, EntryStatus::Failed);
    }

    #[test]
    fn missing_transcript_fails_the_whole_pass() {
        let gaps = AnalysisGaps::default();
        let output = AnalysisOutput {
            ai_summary: Some("summary".to_string()),
            ..Default::default()
        };
        assert_eq!(
            merge_pass(&gaps, &output),
            Err(MergeError::TranscriptMissing)
        );
    }

    // Scenario: brand-new entry, worker only produced a transcript.
    #[test]
    fn transcript_only_pass_is_failed_with_no_mood_labels() {
        let gaps = AnalysisGaps::default();
        let output = AnalysisOutput {
            transcript: Some("ciphertext".to_string()),
            ..Default::default()
        };
        let staged = merge_pass(&gaps, &output).unwrap();
        assert_eq!(staged.transcript.as_deref(), Some("ciphertext"));
        assert!(staged.mood_labels.is_none());
        assert_eq!(staged.status, EntryStatus::Failed);
    }

    // Scenario: only mood scores were missing and the worker supplied them.
    #[test]
    fn final_missing_field_completes_the_entry() {
        let gaps = AnalysisGaps {
            has_transcript: true,
            has_summary: true,
            has_tags: true,
            has_mood_scores: false,
            has_reflections: true,
            has_suggestions: true,
            has_goals: true,
        };
        let output = AnalysisOutput {
            mood_scores: Some(scores(&[("joy", 0.8), ("sadness", 0.2)])),
            ..Default::default()
        };
        let staged = merge_pass(&gaps, &output).unwrap();
        assert_eq!(staged.mood_labels.as_deref(), Some(&["joy".to_string()][..]));
        assert_eq!(staged.status, EntryStatus::Completed);
        assert!(staged.transcript.is_none());
    }

    #[test]
    fn empty_mood_score_map_counts_as_unsupplied() {
        let gaps = AnalysisGaps {
            has_transcript: true,
            has_summary: true,
            has_tags: true,
            has_reflections: true,
            has_suggestions: true,
            has_goals: true,
            has_mood_scores: false,
        };
        let output = AnalysisOutput {
            mood_scores: Some(BTreeMap::new()),
            ..Default::default()
        };
        let staged = merge_pass(&gaps, &output).unwrap();
        assert!(staged.mood_scores.is_none());
        assert_eq!(staged.status, EntryStatus::Failed);
    }

    #[test]
    fn merge_with_no_gaps_stages_nothing_and_completes() {
        let gaps = AnalysisGaps {
            has_transcript: true,
            has_summary: true,
            has_tags: true,
            has_mood_scores: true,
            has_reflections: true,
            has_suggestions: true,
            has_goals: true,
        };
        let staged = merge_pass(&gaps, &AnalysisOutput::default()).unwrap();
        assert!(staged.is_status_only());
        assert!(!staged.reset_goal_added);
        assert_eq!(staged.status, EntryStatus::Completed);
    }

    #[test]
    fn fresh_goal_resets_the_promotion_flag() {
        let gaps = AnalysisGaps {
            has_transcript: true,
            has_summary: true,
            has_tags: true,
            has_mood_scores: true,
            has_reflections: true,
            has_suggestions: true,
            has_goals: false,
        };
        let output = AnalysisOutput {
            goals: Some("goal ciphertext".to_string()),
            ..Default::default()
        };
        let staged = merge_pass(&gaps, &output).unwrap();
        assert!(staged.reset_goal_added);
        assert_eq!(staged.status, EntryStatus::Completed);

        let broadcast = staged.to_broadcast(|_| "goal plaintext".to_string());
        assert_eq!(broadcast.goals.as_deref(), Some("goal plaintext"));
        assert_eq!(broadcast.is_goal_added, Some(false));
    }

    #[test]
    fn broadcast_decrypts_text_fields_but_not_tags_or_moods() {
        let staged = StagedUpdate {
            transcript: Some("aaa".to_string()),
            tags: Some(vec!["work".to_string()]),
            mood_scores: Some(scores(&[("joy", 0.9)])),
            mood_labels: Some(vec!["joy".to_string()]),
            status: EntryStatus::Failed,
            ..Default::default()
        };
        let broadcast = staged.to_broadcast(|c| format!("dec({c})"));
        assert_eq!(broadcast.transcript.as_deref(), Some("dec(aaa)"));
        assert_eq!(broadcast.tags.as_deref(), Some(&["work".to_string()][..]));
        assert_eq!(broadcast.is_goal_added, None);
    }

    #[test]
    fn request_payload_uses_worker_wire_names() {
        let request = AnalysisRequest {
            gaps: AnalysisGaps {
                has_transcript: true,
                ..Default::default()
            },
            audio_url: String::new(),
            transcript: "ciphertext".to_string(),
            user_id: "user_1".to_string(),
            entry_id: Uuid::nil(),
            is_goal_added: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["hasTranscript"], true);
        assert_eq!(json["hasMoodScores"], false);
        assert_eq!(json["audioUrl"], "");
        assert_eq!(json["userId"], "user_1");
        assert_eq!(json["isGoalAdded"], false);
    }

    #[test]
    fn envelope_tolerates_malformed_and_failure_payloads() {
        let envelope: WebhookEnvelope = serde_json::from_str("{}").unwrap();
        assert!(envelope.status.is_none());

        let envelope: WebhookEnvelope =
            serde_json::from_str(r#"{"analysis": "failed", "status": {"entryId": null}}"#).unwrap();
        match envelope.analysis {
            Some(AnalysisPayload::Verdict(v)) => assert_eq!(v, "failed"),
            other => panic!("expected failure verdict, got {other:?}"),
        }

        let envelope: WebhookEnvelope = serde_json::from_str(
            r#"{
                "analysis": {"transcript": "abc", "mood_scores": {"joy": 0.7}},
                "status": {
                    "hasTranscript": false,
                    "userId": "user_1",
                    "entryId": "7f9c24e5-7d6f-4a46-9c50-294d21b13f67"
                }
            }"#,
        )
        .unwrap();
        let echo = envelope.status.unwrap();
        assert_eq!(echo.user_id.as_deref(), Some("user_1"));
        assert!(echo.entry_id.is_some());
        assert!(!echo.gaps.has_transcript);
        match envelope.analysis {
            Some(AnalysisPayload::Output(output)) => {
                assert_eq!(output.transcript.as_deref(), Some("abc"));
                assert_eq!(output.mood_scores.unwrap().len(), 1);
            }
            other => panic!("expected analysis output, got {other:?}"),
        }
    }
}
