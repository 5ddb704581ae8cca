//! The in-memory document: options, pages and everything hung off them.

use std::collections::BTreeMap;

use crate::debug::DebugLogger;
use crate::error::{PdfError, Result};
use crate::object::{Dict, SecurityHandler, Value, fmt};
use crate::outline::OutlineSection;
use crate::perf::PerfLogger;
use crate::resources::{Resource, ResourceCatalog};
use crate::types::{Rect, Size, TextColor};

const SUPPORTED_VERSIONS: &[&str] = &["1.3", "1.4", "1.5", "1.6", "1.7", "2.0"];

/// Initial view of the first page, written as the catalog's `/OpenAction`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoomMode {
    FullPage,
    FullWidth,
    Real,
    /// Leave the viewer's choice alone.
    Default,
    Percent(f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLayout {
    SinglePage,
    OneColumn,
    TwoColumnLeft,
    TwoColumnRight,
    TwoPageLeft,
    TwoPageRight,
}

impl PageLayout {
    pub fn pdf_name(self) -> &'static str {
        match self {
            PageLayout::SinglePage => "SinglePage",
            PageLayout::OneColumn => "OneColumn",
            PageLayout::TwoColumnLeft => "TwoColumnLeft",
            PageLayout::TwoColumnRight => "TwoColumnRight",
            PageLayout::TwoPageLeft => "TwoPageLeft",
            PageLayout::TwoPageRight => "TwoPageRight",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMode {
    UseNone,
    UseOutlines,
    UseThumbs,
    FullScreen,
    UseOC,
    UseAttachments,
}

impl PageMode {
    pub fn pdf_name(self) -> &'static str {
        match self {
            PageMode::UseNone => "UseNone",
            PageMode::UseOutlines => "UseOutlines",
            PageMode::UseThumbs => "UseThumbs",
            PageMode::FullScreen => "FullScreen",
            PageMode::UseOC => "UseOC",
            PageMode::UseAttachments => "UseAttachments",
        }
    }
}

/// A UTC timestamp in PDF date syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PdfDate {
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
}

impl PdfDate {
    pub fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Result<Self> {
        let valid = year <= 9999
            && (1..=12).contains(&month)
            && (1..=31).contains(&day)
            && hour < 24
            && minute < 60
            && second < 60;
        if !valid {
            return Err(PdfError::InvalidConfiguration(format!(
                "invalid date {year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
            )));
        }
        Ok(Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        })
    }

    /// `D:YYYYMMDDHHmmSSZ00'00'`
    pub fn to_pdf_string(&self) -> String {
        format!(
            "D:{:04}{:02}{:02}{:02}{:02}{:02}Z00'00'",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// How the trailer's `/ID` is produced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FileId {
    /// Digest of the file body and the creation date.
    #[default]
    Auto,
    /// Written verbatim between the brackets, e.g. `<AB><AB>`.
    Fixed(String),
    Disabled,
}

#[derive(Clone)]
pub struct DocumentOptions {
    pub(crate) pdf_version: String,
    pub(crate) compress: bool,
    pub(crate) default_page_size: Size,
    pub(crate) single_resources_object: bool,
    pub(crate) allow_images_transparency: bool,
    pub(crate) zoom_mode: ZoomMode,
    pub(crate) page_layout: Option<PageLayout>,
    pub(crate) page_mode: Option<PageMode>,
    pub(crate) lang: Option<String>,
    pub(crate) creation_date: Option<PdfDate>,
    pub(crate) file_id: FileId,
    pub(crate) render_color_fonts: bool,
    pub(crate) text_color: TextColor,
    pub(crate) debug: Option<DebugLogger>,
    pub(crate) perf: Option<PerfLogger>,
    pub(crate) parallel_compression: bool,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            pdf_version: "1.3".to_string(),
            compress: true,
            default_page_size: Size::a4(),
            single_resources_object: false,
            allow_images_transparency: true,
            zoom_mode: ZoomMode::FullWidth,
            page_layout: None,
            page_mode: None,
            lang: None,
            creation_date: None,
            file_id: FileId::Auto,
            render_color_fonts: true,
            text_color: TextColor::default(),
            debug: None,
            perf: None,
            parallel_compression: true,
        }
    }
}

impl DocumentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Minimum header version; raised to 1.4 when transparency is used.
    pub fn pdf_version(mut self, version: impl Into<String>) -> Self {
        self.pdf_version = version.into();
        self
    }

    pub fn compress(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    pub fn default_page_size(mut self, size: Size) -> Self {
        self.default_page_size = size;
        self
    }

    /// One `/Resources` dictionary shared by every page instead of one per page.
    pub fn single_resources_object(mut self, enabled: bool) -> Self {
        self.single_resources_object = enabled;
        self
    }

    // When false, image alpha channels are dropped instead of becoming /SMask images.
    pub fn allow_images_transparency(mut self, enabled: bool) -> Self {
        self.allow_images_transparency = enabled;
        self
    }

    pub fn zoom_mode(mut self, mode: ZoomMode) -> Self {
        self.zoom_mode = mode;
        self
    }

    pub fn page_layout(mut self, layout: PageLayout) -> Self {
        self.page_layout = Some(layout);
        self
    }

    pub fn page_mode(mut self, mode: PageMode) -> Self {
        self.page_mode = Some(mode);
        self
    }

    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    pub fn creation_date(mut self, date: PdfDate) -> Self {
        self.creation_date = Some(date);
        self
    }

    pub fn file_id(mut self, file_id: FileId) -> Self {
        self.file_id = file_id;
        self
    }

    // When false, fonts without outlines are rejected and color tables are ignored.
    pub fn render_color_fonts(mut self, enabled: bool) -> Self {
        self.render_color_fonts = enabled;
        self
    }

    pub fn text_color(mut self, color: TextColor) -> Self {
        self.text_color = color;
        self
    }

    pub fn debug(mut self, logger: DebugLogger) -> Self {
        self.debug = Some(logger);
        self
    }

    pub fn perf(mut self, logger: PerfLogger) -> Self {
        self.perf = Some(logger);
        self
    }

    pub fn parallel_compression(mut self, enabled: bool) -> Self {
        self.parallel_compression = enabled;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !SUPPORTED_VERSIONS.contains(&self.pdf_version.as_str()) {
            return Err(PdfError::InvalidConfiguration(format!(
                "unsupported PDF version {:?}",
                self.pdf_version
            )));
        }
        validate_size(self.default_page_size)?;
        if let ZoomMode::Percent(percent) = self.zoom_mode {
            if !percent.is_finite() || percent <= 0.0 {
                return Err(PdfError::InvalidConfiguration(format!(
                    "zoom percentage must be positive, got {percent}"
                )));
            }
        }
        Ok(())
    }
}

fn validate_size(size: Size) -> Result<()> {
    if !(size.width.is_finite() && size.height.is_finite() && size.width > 0.0 && size.height > 0.0)
    {
        return Err(PdfError::InvalidConfiguration(format!(
            "page size must be positive, got {}x{}",
            size.width, size.height
        )));
    }
    Ok(())
}

/// Target of a link or bookmark: a point on a 1-based page, in PDF units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Destination {
    pub page_number: usize,
    pub top: Option<f32>,
    pub left: f32,
    pub zoom: Option<f32>,
}

impl Destination {
    pub fn new(page_number: usize) -> Self {
        Self {
            page_number,
            top: None,
            left: 0.0,
            zoom: None,
        }
    }

    pub fn at(page_number: usize, left: f32, top: f32) -> Self {
        Self {
            page_number,
            top: Some(top),
            left,
            zoom: None,
        }
    }

    /// `[page /XYZ left top zoom]`, where `page_ref` is the page's `N 0 R`.
    pub(crate) fn serialize(&self, page_ref: &str) -> String {
        let top = self.top.map(fmt).unwrap_or_else(|| "null".to_string());
        let zoom = self.zoom.map(fmt).unwrap_or_else(|| "null".to_string());
        format!("[{page_ref} /XYZ {} {top} {zoom}]", fmt(self.left))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLabelStyle {
    /// Decimal arabic numerals.
    Decimal,
    UpperRoman,
    LowerRoman,
    UpperLetters,
    LowerLetters,
}

impl PageLabelStyle {
    fn pdf_name(self) -> &'static str {
        match self {
            PageLabelStyle::Decimal => "D",
            PageLabelStyle::UpperRoman => "R",
            PageLabelStyle::LowerRoman => "r",
            PageLabelStyle::UpperLetters => "A",
            PageLabelStyle::LowerLetters => "a",
        }
    }
}

/// Labeling of a page range; applies from its page until the next labeled one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageLabel {
    pub style: Option<PageLabelStyle>,
    pub prefix: Option<String>,
    pub start: Option<u32>,
}

impl PageLabel {
    pub(crate) fn dict(&self) -> Dict {
        let mut dict = Dict::new();
        if let Some(style) = self.style {
            dict.set("S", Value::name(style.pdf_name()));
        }
        if let Some(prefix) = &self.prefix {
            dict.set("P", Value::text(prefix.as_str()));
        }
        if let Some(start) = self.start {
            dict.set("St", Value::Int(start as i64));
        }
        dict
    }

    /// Label of the page `offset` pages after the first page of the range.
    pub fn display(&self, offset: u32) -> String {
        let value = self.start.unwrap_or(1) + offset;
        let number = match self.style {
            None => String::new(),
            Some(PageLabelStyle::Decimal) => value.to_string(),
            Some(PageLabelStyle::UpperRoman) => to_roman(value),
            Some(PageLabelStyle::LowerRoman) => to_roman(value).to_lowercase(),
            Some(PageLabelStyle::UpperLetters) => to_letters(value),
            Some(PageLabelStyle::LowerLetters) => to_letters(value).to_lowercase(),
        };
        format!("{}{number}", self.prefix.as_deref().unwrap_or(""))
    }
}

fn to_roman(mut value: u32) -> String {
    const NUMERALS: [(u32, &str); 13] = [
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];
    let mut out = String::new();
    for (amount, numeral) in NUMERALS {
        while value >= amount {
            out.push_str(numeral);
            value -= amount;
        }
    }
    out
}

/// A..Z, then AA..ZZ, then AAA..ZZZ.
fn to_letters(value: u32) -> String {
    if value == 0 {
        return String::new();
    }
    let letter = (b'A' + ((value - 1) % 26) as u8) as char;
    letter.to_string().repeat(((value - 1) / 26 + 1) as usize)
}

#[derive(Debug, Clone, PartialEq)]
pub enum LinkTarget {
    Destination(Destination),
    /// A name declared with [`Document::add_named_destination`].
    Named(String),
    Uri(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationKind {
    Link(LinkTarget),
    /// Widget of the signature field filled by the [`Signer`].
    Signature { field_name: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub kind: AnnotationKind,
    /// Page rectangle in PDF units.
    pub rect: Rect,
    pub contents: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedFile {
    pub basename: String,
    pub bytes: Vec<u8>,
    pub description: Option<String>,
    pub creation_date: Option<PdfDate>,
    pub modification_date: Option<PdfDate>,
    /// Also listed in the catalog's `/AF` array.
    pub globally_enclosed: bool,
}

impl EmbeddedFile {
    pub fn new(basename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            basename: basename.into(),
            bytes,
            description: None,
            creation_date: None,
            modification_date: None,
            globally_enclosed: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub author: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
}

/// Final transform over the finished file, typically a detached signature.
pub trait Signer {
    fn sign(&self, buffer: Vec<u8>) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct Page {
    pub(crate) index: usize,
    pub(crate) size: Size,
    pub(crate) content: Vec<u8>,
    pub(crate) annotations: Vec<Annotation>,
    pub(crate) label: Option<PageLabel>,
}

impl Page {
    /// 1-based position in the document.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn label(&self) -> Option<&PageLabel> {
        self.label.as_ref()
    }
}

pub struct Document {
    pub(crate) options: DocumentOptions,
    pub(crate) pages: Vec<Page>,
    pub(crate) catalog: ResourceCatalog,
    pub(crate) outline: Vec<OutlineSection>,
    /// Declared names; `None` until the destination is set.
    pub(crate) named_destinations: BTreeMap<String, Option<Destination>>,
    pub(crate) embedded_files: Vec<EmbeddedFile>,
    pub(crate) metadata: Metadata,
    pub(crate) xmp_metadata: Option<String>,
    pub(crate) security: Option<Box<dyn SecurityHandler>>,
    pub(crate) signer: Option<Box<dyn Signer>>,
}

impl Document {
    pub fn new(options: DocumentOptions) -> Result<Self> {
        options.validate()?;
        let catalog = ResourceCatalog::new(options.render_color_fonts);
        Ok(Self {
            options,
            pages: Vec::new(),
            catalog,
            outline: Vec::new(),
            named_destinations: BTreeMap::new(),
            embedded_files: Vec::new(),
            metadata: Metadata::default(),
            xmp_metadata: None,
            security: None,
            signer: None,
        })
    }

    pub fn options(&self) -> &DocumentOptions {
        &self.options
    }

    /// Appends a page of the default size and returns its 1-based number.
    pub fn add_page(&mut self) -> usize {
        self.push_page(self.options.default_page_size)
    }

    pub fn add_page_with_size(&mut self, size: Size) -> Result<usize> {
        validate_size(size)?;
        Ok(self.push_page(size))
    }

    fn push_page(&mut self, size: Size) -> usize {
        let index = self.pages.len() + 1;
        self.pages.push(Page {
            index,
            size,
            content: Vec::new(),
            annotations: Vec::new(),
            label: None,
        });
        index
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, number: usize) -> Option<&Page> {
        number.checked_sub(1).and_then(|idx| self.pages.get(idx))
    }

    fn page_mut(&mut self, number: usize) -> Result<&mut Page> {
        let count = self.pages.len();
        number
            .checked_sub(1)
            .and_then(|idx| self.pages.get_mut(idx))
            .ok_or_else(|| {
                PdfError::structural(format!("page {number} does not exist ({count} pages)"))
            })
    }

    /// Appends one line of content operators and records the resources it invokes.
    pub fn push_content(&mut self, page: usize, operators: &str) -> Result<()> {
        let target = self.page_mut(page)?;
        target.content.extend_from_slice(operators.as_bytes());
        target.content.push(b'\n');
        self.catalog.scan(operators.as_bytes(), page);
        Ok(())
    }

    /// Records explicit usage of `resource` on `page` and returns its name.
    pub fn use_resource(&mut self, page: usize, resource: Resource) -> Result<String> {
        self.page_mut(page)?;
        Ok(self.catalog.register(resource, Some(page)))
    }

    pub fn resources(&self) -> &ResourceCatalog {
        &self.catalog
    }

    pub fn resources_mut(&mut self) -> &mut ResourceCatalog {
        &mut self.catalog
    }

    /// Registers a TrueType/OpenType font and returns its index (`/F{index}`).
    pub fn add_font(&mut self, family: &str, style: &str, data: Vec<u8>) -> Result<usize> {
        self.catalog.fonts_mut().add_font(family, style, data)
    }

    /// Color glyphs of `font` use `CPAL` palette `palette`.
    pub fn set_font_palette(&mut self, font: usize, palette: usize) -> Result<()> {
        self.catalog.fonts_mut().set_palette(font, palette)
    }

    /// Color glyphs of `font` render at `value` on variation axis `axis`
    /// instead of the default instance.
    pub fn set_font_variation(&mut self, font: usize, axis: &str, value: f32) -> Result<()> {
        self.catalog.fonts_mut().set_variation(font, axis, value)
    }

    /// Text operand for `Tj` in font `font` at `size_pt`.
    pub fn encode_text(&mut self, font: usize, size_pt: f32, text: &str) -> Result<String> {
        self.catalog.fonts_mut().encode_text(font, size_pt, text)
    }

    /// Decodes an image and returns its index (`/I{index}`).
    pub fn preload_image(&mut self, bytes: &[u8]) -> Result<usize> {
        let (_, index, _) = self.catalog.images_mut().preload(bytes)?;
        Ok(index)
    }

    pub fn set_page_label(&mut self, page: usize, label: PageLabel) -> Result<()> {
        self.page_mut(page)?.label = Some(label);
        Ok(())
    }

    /// Displayed label of `page`, following the closest labeled page at or
    /// before it. `None` when no page up to it carries a label.
    pub fn page_label_text(&self, page: usize) -> Option<String> {
        let upto = self.pages.get(..page)?;
        let (offset, label) = upto
            .iter()
            .rev()
            .enumerate()
            .find_map(|(offset, p)| p.label.as_ref().map(|label| (offset, label)))?;
        Some(label.display(offset as u32))
    }

    pub fn add_annotation(&mut self, page: usize, annotation: Annotation) -> Result<()> {
        if let AnnotationKind::Signature { .. } = annotation.kind {
            let exists = self.pages.iter().any(|p| {
                p.annotations
                    .iter()
                    .any(|a| matches!(a.kind, AnnotationKind::Signature { .. }))
            });
            if exists {
                return Err(PdfError::structural(
                    "a document holds at most one signature field",
                ));
            }
        }
        self.page_mut(page)?.annotations.push(annotation);
        Ok(())
    }

    pub fn add_link(&mut self, page: usize, rect: Rect, target: LinkTarget) -> Result<()> {
        self.add_annotation(
            page,
            Annotation {
                kind: AnnotationKind::Link(target),
                rect,
                contents: None,
            },
        )
    }

    /// Declares a name that links may target before its page exists.
    pub fn add_named_destination(&mut self, name: impl Into<String>) {
        self.named_destinations.entry(name.into()).or_insert(None);
    }

    pub fn set_named_destination(&mut self, name: impl Into<String>, dest: Destination) {
        self.named_destinations.insert(name.into(), Some(dest));
    }

    pub fn add_outline_section(&mut self, name: impl Into<String>, level: usize, dest: Destination) {
        self.outline.push(OutlineSection {
            name: name.into(),
            level,
            dest,
        });
    }

    pub fn embed_file(&mut self, file: EmbeddedFile) {
        self.embedded_files.push(file);
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// Raw XMP; it is wrapped in an `<?xpacket?>` envelope on output.
    pub fn set_xmp_metadata(&mut self, xmp: impl Into<String>) {
        self.xmp_metadata = Some(xmp.into());
    }

    pub fn set_security_handler(&mut self, handler: Box<dyn SecurityHandler>) {
        self.security = Some(handler);
    }

    pub fn set_signer(&mut self, signer: Box<dyn Signer>) {
        self.signer = Some(signer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_options_are_rejected() {
        let bad_version = DocumentOptions::new().pdf_version("1.9");
        assert!(matches!(
            Document::new(bad_version),
            Err(PdfError::InvalidConfiguration(_))
        ));
        let bad_zoom = DocumentOptions::new().zoom_mode(ZoomMode::Percent(0.0));
        assert!(Document::new(bad_zoom).is_err());
        let bad_size = DocumentOptions::new().default_page_size(Size::new(0.0, 10.0));
        assert!(Document::new(bad_size).is_err());
        let mut doc = Document::new(DocumentOptions::default()).unwrap();
        assert!(doc.add_page_with_size(Size::new(10.0, -1.0)).is_err());
    }

    #[test]
    fn dates_use_pdf_syntax() {
        let date = PdfDate::new(2024, 2, 29, 13, 5, 9).unwrap();
        assert_eq!(date.to_pdf_string(), "D:20240229130509Z00'00'");
        assert!(PdfDate::new(2024, 13, 1, 0, 0, 0).is_err());
    }

    #[test]
    fn labels_count_from_the_last_labeled_page() {
        let mut doc = Document::new(DocumentOptions::default()).unwrap();
        for _ in 0..5 {
            doc.add_page();
        }
        assert_eq!(doc.page_label_text(1), None);
        doc.set_page_label(
            1,
            PageLabel {
                style: Some(PageLabelStyle::LowerRoman),
                prefix: None,
                start: None,
            },
        )
        .unwrap();
        doc.set_page_label(
            4,
            PageLabel {
                style: Some(PageLabelStyle::Decimal),
                prefix: Some("A-".to_string()),
                start: Some(7),
            },
        )
        .unwrap();
        assert_eq!(doc.page_label_text(3).as_deref(), Some("iii"));
        assert_eq!(doc.page_label_text(5).as_deref(), Some("A-8"));
        assert_eq!(to_letters(28), "BB");
        assert_eq!(to_roman(1994), "MCMXCIV");
    }

    #[test]
    fn content_lines_are_scanned_for_resources() {
        let mut doc = Document::new(DocumentOptions::default()).unwrap();
        let page = doc.add_page();
        doc.push_content(page, "BT /F1 12 Tf (x) Tj ET").unwrap();
        doc.push_content(page, "/GS0 gs").unwrap();
        let usage = doc.resources().page_usage(page).unwrap();
        assert!(usage.fonts.contains(&1));
        assert!(usage.graphics_states.contains("GS0"));
        assert_eq!(doc.page(page).unwrap().content(), b"BT /F1 12 Tf (x) Tj ET\n/GS0 gs\n");
        assert!(doc.push_content(2, "q Q").is_err());
    }

    #[test]
    fn only_one_signature_field() {
        let mut doc = Document::new(DocumentOptions::default()).unwrap();
        let page = doc.add_page();
        let signature = Annotation {
            kind: AnnotationKind::Signature {
                field_name: "Signature1".to_string(),
            },
            rect: Rect::new(0.0, 0.0, 10.0, 10.0),
            contents: None,
        };
        doc.add_annotation(page, signature.clone()).unwrap();
        assert!(matches!(
            doc.add_annotation(page, signature),
            Err(PdfError::Structural(_))
        ));
    }

    #[test]
    fn destinations_serialize_as_xyz() {
        let dest = Destination::at(2, 10.0, 500.5);
        assert_eq!(dest.serialize("7 0 R"), "[7 0 R /XYZ 10 500.5 null]");
        assert_eq!(Destination::new(1).serialize("3 0 R"), "[3 0 R /XYZ 0 null null]");
    }
}
