// Core types, seams and the player registry for Chorus

pub mod callback;
pub mod delegate;
pub mod error;
pub mod handle;
pub mod player;
pub mod registry;
pub mod source;
pub mod state;
pub mod time;

// Re-export commonly used types
pub use callback::{ListenerHub, NotificationScope, PlayingListener, PlayingObserver, Transition};
pub use delegate::PlaybackDelegate;
pub use error::{AudioError, Result};
pub use handle::PlayerHandle;
pub use player::{BackendFactory, PlaybackBackend};
pub use registry::{PlayerRegistry, SharedHandle};
pub use source::{resolve_source, AssetResolver, DirectoryAssetResolver, ResolvedSource};
pub use state::{validate_volume, HandleState, PlaybackState, PlayerConfig, PlayerId};
pub use time::{millis_to_secs, secs_to_millis, NativeTime};
