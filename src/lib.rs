//! PDF document assembly: an id-ordered object graph written in one pass,
//! per-page resource dictionaries, subset font embedding and color glyphs
//! compiled into Type3 fonts.

mod bitmap;
mod cff;
mod cmap;
mod colr;
mod cpal;
mod debug;
mod document;
mod draw;
mod embed;
mod error;
#[cfg(test)]
mod fixtures;
mod font;
mod images;
mod object;
mod outline;
mod paint;
mod perf;
mod resources;
mod sbix;
mod shading;
mod subset;
mod svg;
mod type3;
mod types;
mod varstore;
mod widths;
mod writer;

pub use cmap::Ros;
pub use debug::DebugLogger;
pub use document::{
    Annotation, AnnotationKind, Destination, Document, DocumentOptions, EmbeddedFile, FileId,
    LinkTarget, Metadata, Page, PageLabel, PageLabelStyle, PageLayout, PageMode, PdfDate, Signer,
    ZoomMode,
};
pub use error::{PdfError, Result};
pub use font::{CoreFont, FontRegistry, RegisteredFont, SubsetGlyph, TtfFont};
pub use images::{ImageCache, ImageColorSpace, ImageInfo};
pub use object::{Dict, ObjId, PdfObject, SecurityHandler, Stream, Value};
pub use outline::OutlineSection;
pub use perf::PerfLogger;
pub use resources::{
    GraphicsStyle, ImageSoftMask, Resource, ResourceCatalog, ResourceKind, SoftMask, UsageSet,
    VectorSoftMask,
};
pub use shading::{ColorStop, Gradient, GradientGeometry, Pattern};
pub use types::{BlendMode, Matrix, Rect, Rgba, Size, TextColor};
