//! The interactive confession experience.
//!
//! - [`ConfessionFlow`]: pure state machine over reveal steps, the decision
//!   screen and the accepted state.
//! - [`compute_offset`]: where the decline control jumps for a pointer.
//! - [`FlowSession`]: a flow wired to the store and presentation
//!   collaborators (notifications, navigation, media).
//! - [`ShareView`]: read-only page for a stored confession.

pub mod effects;
mod evasion;
mod machine;
mod session;
mod share;

pub use effects::{
    Clipboard, ClipboardError, LogNotifier, MediaPlayer, Navigator, Notice, NoticeKind, Notifier,
};
pub use evasion::*;
pub use machine::*;
pub use session::*;
pub use share::*;
