// Platform-facing backends
// Avatar download over HTTP and the communication rendering seam

pub mod avatar;
pub mod communication;

pub use avatar::{AvatarFetcher, FetchedAvatar, determine_extension, parse_avatar_url};
pub use communication::{
    COMMUNICATION_MIN_VERSION, CommunicationRenderer, CommunicationStyleRenderer,
};
