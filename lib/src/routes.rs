pub const HOME: &str = "/";

pub const UPLOAD: &str = "/upload";

pub const IMAGES: &str = "/images";
pub const IMAGES_NEARBY: &str = "/images/nearby";
pub const IMAGE: &str = "/images/:filename";

pub const HEALTH: &str = "/health";

/// Prefix under which the content store is served.
pub const STATIC: &str = "/static";
