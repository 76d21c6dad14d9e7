//! Meeting lifecycle state machine (spec §4.E): creation, scheduling,
//! join/leave with host succession, end/cancel, settings updates, and
//! permission derivation. Pure over `meeting-types::Meeting` — storage is
//! `meeting-repository`'s concern, not this crate's.

pub mod permissions;
pub mod transitions;

pub use permissions::{can_chat, can_mute_others, can_record, can_remove_others, can_screen_share, is_host};
pub use transitions::{
    cancel_meeting, create_meeting, end_meeting, join_meeting, leave_meeting, schedule_meeting,
    update_settings, JoinOutcome, SettingsPatch,
};
