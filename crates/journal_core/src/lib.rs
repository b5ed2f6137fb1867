pub mod analysis;
pub mod domain;
pub mod ports;

pub use analysis::{
    merge_pass, significant_moods, AnalysisBroadcast, AnalysisGaps, AnalysisOutput,
    AnalysisPayload, AnalysisRequest, DispatchEcho, EntryUpdate, MergeError, StagedUpdate,
    WebhookEnvelope, MOOD_SIGNIFICANCE_CUTOFF, NO_GOAL_SENTINEL,
};
pub use domain::{
    Entry, EntryStatus, EntrySummary, Goal, GoalUpdate, MoodInsights, NewGoal,
};
pub use ports::{
    AnalysisService, DatabaseService, EntryPage, FieldCipher, IdentityService, PortError,
    PortResult, StatusPublisher, StorageService,
};
