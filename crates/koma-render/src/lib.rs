pub mod export;
pub mod fonts;
pub mod hit;
pub mod images;
pub mod raster;
pub mod text;

pub use export::{ExportError, ExportImage, ExportOptions, export_page, export_panel, page_height};
pub use fonts::{FontBook, FontError};
pub use hit::{hit_test, object_transform};
pub use images::{ImageCache, ImageError, ImageSource, MemoryStore, image_refs};
pub use raster::Compositor;
pub use text::{TextMeasure, auto_font_size};
