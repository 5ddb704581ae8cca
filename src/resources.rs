//! Resource naming and per-page usage tracking.
//!
//! Fonts and images are named by their own registries (`/F{n}`, `/I{n}`);
//! graphics states, patterns and shadings are named here on first sight.
//! Every name a page (or a Type3 font, or a soft-mask form) invokes lands in
//! a [`UsageSet`], which is all a `/Resources` dictionary is built from.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::bytes::Regex;

use crate::error::{PdfError, Result};
use crate::font::{FontRegistry, is_core_family, normalize_name, style_key};
use crate::images::ImageCache;
use crate::object::{Dict, ObjId, Value, fmt};
use crate::shading::{Gradient, Pattern};
use crate::types::{BlendMode, Matrix, Rect};

static GS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(GS\d+) gs").expect("BUG: invalid GS_RE regex literal"));
static IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/I(\d+) Do").expect("BUG: invalid IMAGE_RE regex literal"));
static FILL_PATTERN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/(P\d+)\s+scn").expect("BUG: invalid FILL_PATTERN_RE regex literal")
});
static STROKE_PATTERN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/(P\d+)\s+SCN").expect("BUG: invalid STROKE_PATTERN_RE regex literal")
});
static FONT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/F(\d+)\s+[-+]?\d+(?:\.\d+)?\s+Tf").expect("BUG: invalid FONT_RE regex literal")
});
static SHADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(Sh\d+) sh").expect("BUG: invalid SHADING_RE regex literal"));

const PROC_SET: &[&str] = &["PDF", "Text", "ImageB", "ImageC", "ImageI"];

/// Family aliases resolved to a standard font.
const FONT_ALIASES: &[(&str, &str)] = &[
    ("sans-serif", "helvetica"),
    ("sans serif", "helvetica"),
    ("arial", "helvetica"),
    ("verdana", "helvetica"),
    ("tahoma", "helvetica"),
    ("segoe ui", "helvetica"),
    ("serif", "times"),
    ("times", "times"),
    ("times new roman", "times"),
    ("georgia", "times"),
    ("cambria", "times"),
    ("garamond", "times"),
    ("monospace", "courier"),
    ("courier", "courier"),
    ("courier new", "courier"),
    ("consolas", "courier"),
    ("monaco", "courier"),
    ("symbol", "symbol"),
    ("zapfdingbats", "zapfdingbats"),
    ("zapf dingbats", "zapfdingbats"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Font,
    Image,
    GraphicsState,
    Pattern,
    Shading,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    /// Font index as handed out by the font registry.
    Font(usize),
    /// Image index as handed out by the image cache.
    Image(usize),
    /// A name returned by [`ResourceCatalog::add_graphics_style`].
    GraphicsState(String),
    Pattern(Pattern),
    Shading(Gradient),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Font(_) => ResourceKind::Font,
            Resource::Image(_) => ResourceKind::Image,
            Resource::GraphicsState(_) => ResourceKind::GraphicsState,
            Resource::Pattern(_) => ResourceKind::Pattern,
            Resource::Shading(_) => ResourceKind::Shading,
        }
    }
}

/// Image used as a luminosity soft mask, drawn with `matrix` inside `bbox`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSoftMask {
    pub image: usize,
    pub bbox: Rect,
    pub matrix: Matrix,
}

/// Luminosity soft mask drawn from gray-level path operators inside `bbox`.
/// The operators may select the `/Cov` graphics state, which applies `blend`.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorSoftMask {
    pub bbox: Rect,
    pub blend: BlendMode,
    pub operators: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SoftMask {
    Image(ImageSoftMask),
    Vector(VectorSoftMask),
}

impl SoftMask {
    pub fn bbox(&self) -> Rect {
        match self {
            SoftMask::Image(mask) => mask.bbox,
            SoftMask::Vector(mask) => mask.bbox,
        }
    }

    pub(crate) fn image(&self) -> Option<usize> {
        match self {
            SoftMask::Image(mask) => Some(mask.image),
            SoftMask::Vector(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphicsStyle {
    pub fill_alpha: Option<f32>,
    pub stroke_alpha: Option<f32>,
    pub blend_mode: Option<BlendMode>,
    pub soft_mask: Option<SoftMask>,
}

impl GraphicsStyle {
    pub fn fill_alpha(alpha: f32) -> Self {
        Self {
            fill_alpha: Some(alpha),
            ..Self::default()
        }
    }

    pub fn blend(mode: BlendMode) -> Self {
        Self {
            blend_mode: Some(mode),
            ..Self::default()
        }
    }

    fn key(&self) -> String {
        let mut out = String::new();
        if let Some(alpha) = self.fill_alpha {
            out.push_str(&format!("/ca {} ", fmt(alpha)));
        }
        if let Some(alpha) = self.stroke_alpha {
            out.push_str(&format!("/CA {} ", fmt(alpha)));
        }
        if let Some(mode) = self.blend_mode {
            out.push_str(&format!("/BM /{} ", mode.pdf_name()));
        }
        if let Some(mask) = &self.soft_mask {
            let bbox = mask.bbox();
            let bounds = format!(
                "{} {} {} {}",
                fmt(bbox.x_min),
                fmt(bbox.y_min),
                fmt(bbox.x_max),
                fmt(bbox.y_max)
            );
            match mask {
                SoftMask::Image(mask) => out.push_str(&format!(
                    "/SMask I{} {bounds} {}",
                    mask.image,
                    mask.matrix.operands()
                )),
                SoftMask::Vector(mask) => out.push_str(&format!(
                    "/SMask V {bounds} /{} {}",
                    mask.blend.pdf_name(),
                    mask.operators
                )),
            }
        }
        out
    }

    /// The `/ExtGState` dictionary; a soft mask is linked during plumbing.
    pub(crate) fn ext_gstate_dict(&self) -> Dict {
        let mut dict = Dict::typed("ExtGState");
        if let Some(alpha) = self.fill_alpha {
            dict.set("ca", Value::Real(alpha));
        }
        if let Some(alpha) = self.stroke_alpha {
            dict.set("CA", Value::Real(alpha));
        }
        if let Some(mode) = self.blend_mode {
            dict.set("BM", Value::name(mode.pdf_name()));
        }
        dict
    }
}

/// Resource names invoked by one content stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageSet {
    pub fonts: BTreeSet<usize>,
    pub images: BTreeSet<usize>,
    pub graphics_states: BTreeSet<String>,
    pub patterns: BTreeSet<String>,
    pub shadings: BTreeSet<String>,
}

impl UsageSet {
    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
            && self.images.is_empty()
            && self.graphics_states.is_empty()
            && self.patterns.is_empty()
            && self.shadings.is_empty()
    }

    pub(crate) fn merge(&mut self, other: &UsageSet) {
        self.fonts.extend(other.fonts.iter().copied());
        self.images.extend(other.images.iter().copied());
        self.graphics_states.extend(other.graphics_states.iter().cloned());
        self.patterns.extend(other.patterns.iter().cloned());
        self.shadings.extend(other.shadings.iter().cloned());
    }

    fn contains(&self, kind: ResourceKind) -> bool {
        match kind {
            ResourceKind::Font => !self.fonts.is_empty(),
            ResourceKind::Image => !self.images.is_empty(),
            ResourceKind::GraphicsState => !self.graphics_states.is_empty(),
            ResourceKind::Pattern => !self.patterns.is_empty(),
            ResourceKind::Shading => !self.shadings.is_empty(),
        }
    }
}

/// Object ids assigned to named resources during setup.
#[derive(Debug, Clone, Default)]
pub(crate) struct ResourceRefs {
    pub(crate) fonts: BTreeMap<usize, ObjId>,
    pub(crate) images: BTreeMap<usize, ObjId>,
    pub(crate) graphics_states: BTreeMap<String, ObjId>,
    pub(crate) patterns: BTreeMap<String, ObjId>,
    pub(crate) shadings: BTreeMap<String, ObjId>,
}

fn lookup<K: Ord + std::fmt::Display>(
    refs: &BTreeMap<K, ObjId>,
    key: &K,
    label: &str,
) -> Result<ObjId> {
    refs.get(key)
        .copied()
        .ok_or_else(|| PdfError::structural(format!("{label}{key} is used but has no object")))
}

/// Registry of every named resource of one build.
#[derive(Debug)]
pub struct ResourceCatalog {
    pub(crate) fonts: FontRegistry,
    pub(crate) images: ImageCache,
    styles: Vec<(String, GraphicsStyle)>,
    style_names: HashMap<String, String>,
    patterns: Vec<(String, Pattern)>,
    pattern_names: HashMap<String, String>,
    shadings: Vec<(String, Gradient)>,
    shading_names: HashMap<String, String>,
    usage: BTreeMap<usize, UsageSet>,
}

impl ResourceCatalog {
    pub fn new(render_color_fonts: bool) -> Self {
        Self {
            fonts: FontRegistry::new(render_color_fonts),
            images: ImageCache::new(),
            styles: Vec::new(),
            style_names: HashMap::new(),
            patterns: Vec::new(),
            pattern_names: HashMap::new(),
            shadings: Vec::new(),
            shading_names: HashMap::new(),
            usage: BTreeMap::new(),
        }
    }

    pub fn fonts(&self) -> &FontRegistry {
        &self.fonts
    }

    pub fn fonts_mut(&mut self) -> &mut FontRegistry {
        &mut self.fonts
    }

    pub fn images(&self) -> &ImageCache {
        &self.images
    }

    pub fn images_mut(&mut self) -> &mut ImageCache {
        &mut self.images
    }

    /// Returns the `GS{n}` name for `style`, numbering from 0.
    pub fn add_graphics_style(&mut self, style: GraphicsStyle) -> String {
        let key = style.key();
        if let Some(name) = self.style_names.get(&key) {
            return name.clone();
        }
        let name = format!("GS{}", self.styles.len());
        if let Some(image) = style.soft_mask.as_ref().and_then(SoftMask::image) {
            self.images.mark_used(image);
        }
        self.style_names.insert(key, name.clone());
        self.styles.push((name.clone(), style));
        name
    }

    /// Records `resource` as used by `page` (when given) and returns its name.
    pub fn register(&mut self, resource: Resource, page: Option<usize>) -> String {
        match page {
            Some(page) => {
                let mut usage = self.usage.remove(&page).unwrap_or_default();
                let name = self.register_into(&mut usage, resource);
                self.usage.insert(page, usage);
                name
            }
            None => self.name_resource(resource, None),
        }
    }

    /// Like [`register`](Self::register), recording into a caller-owned set.
    pub(crate) fn register_into(&mut self, usage: &mut UsageSet, resource: Resource) -> String {
        self.name_resource(resource, Some(usage))
    }

    fn name_resource(&mut self, resource: Resource, usage: Option<&mut UsageSet>) -> String {
        match resource {
            Resource::Font(index) => {
                if let Some(usage) = usage {
                    usage.fonts.insert(index);
                }
                format!("F{index}")
            }
            Resource::Image(index) => {
                self.images.mark_used(index);
                if let Some(usage) = usage {
                    usage.images.insert(index);
                }
                format!("I{index}")
            }
            Resource::GraphicsState(name) => {
                if let Some(usage) = usage {
                    usage.graphics_states.insert(name.clone());
                }
                name
            }
            Resource::Pattern(pattern) => {
                let key = pattern.key();
                let name = match self.pattern_names.get(&key) {
                    Some(name) => name.clone(),
                    None => {
                        let name = format!("P{}", self.patterns.len() + 1);
                        self.pattern_names.insert(key, name.clone());
                        self.patterns.push((name.clone(), pattern));
                        name
                    }
                };
                if let Some(usage) = usage {
                    usage.patterns.insert(name.clone());
                }
                name
            }
            Resource::Shading(gradient) => {
                let key = gradient.key();
                let name = match self.shading_names.get(&key) {
                    Some(name) => name.clone(),
                    None => {
                        let name = format!("Sh{}", self.shadings.len() + 1);
                        self.shading_names.insert(key, name.clone());
                        self.shadings.push((name.clone(), gradient));
                        name
                    }
                };
                if let Some(usage) = usage {
                    usage.shadings.insert(name.clone());
                }
                name
            }
        }
    }

    /// Merges the resource invocations found in `content` into `page`'s usage.
    pub fn scan(&mut self, content: &[u8], page: usize) {
        let mut usage = self.usage.remove(&page).unwrap_or_default();
        self.scan_into(content, &mut usage);
        self.usage.insert(page, usage);
    }

    pub(crate) fn scan_into(&mut self, content: &[u8], usage: &mut UsageSet) {
        for caps in GS_RE.captures_iter(content) {
            usage.graphics_states.insert(capture_text(&caps[1]));
        }
        for caps in IMAGE_RE.captures_iter(content) {
            if let Some(index) = capture_index(&caps[1]) {
                self.images.mark_used(index);
                usage.images.insert(index);
            }
        }
        for caps in FILL_PATTERN_RE
            .captures_iter(content)
            .chain(STROKE_PATTERN_RE.captures_iter(content))
        {
            usage.patterns.insert(capture_text(&caps[1]));
        }
        for caps in SHADING_RE.captures_iter(content) {
            usage.shadings.insert(capture_text(&caps[1]));
        }
        for caps in FONT_RE.captures_iter(content) {
            if let Some(index) = capture_index(&caps[1]) {
                usage.fonts.insert(index);
            }
        }
    }

    pub fn page_usage(&self, page: usize) -> Option<&UsageSet> {
        self.usage.get(&page)
    }

    /// Everything registered, for a single shared `/Resources` dictionary.
    pub(crate) fn all_usage(&self) -> UsageSet {
        let mut all = UsageSet {
            fonts: self.fonts.iter().map(|font| font.index()).collect(),
            images: self.images.used().map(|info| info.index).collect(),
            graphics_states: self.styles.iter().map(|(name, _)| name.clone()).collect(),
            patterns: self.patterns.iter().map(|(name, _)| name.clone()).collect(),
            shadings: self.shadings.iter().map(|(name, _)| name.clone()).collect(),
        };
        for usage in self.usage.values() {
            all.merge(usage);
        }
        all
    }

    pub(crate) fn graphics_styles(&self) -> impl Iterator<Item = (&str, &GraphicsStyle)> {
        self.styles.iter().map(|(name, style)| (name.as_str(), style))
    }

    pub(crate) fn patterns(&self) -> impl Iterator<Item = (&str, &Pattern)> {
        self.patterns.iter().map(|(name, pattern)| (name.as_str(), pattern))
    }

    pub(crate) fn shadings(&self) -> impl Iterator<Item = (&str, &Gradient)> {
        self.shadings.iter().map(|(name, gradient)| (name.as_str(), gradient))
    }

    /// Resolves a CSS-like family list and style to a registered font index.
    ///
    /// Each comma-separated candidate is tried as a registered font, then a
    /// standard font, then an alias of one.
    pub fn font_from_family(&mut self, family: &str, style: &str) -> Result<usize> {
        if family.trim().is_empty() {
            return Err(PdfError::FontLookup("Empty font family".to_string()));
        }
        let style = style_key(style);
        for candidate in family.split(',') {
            let name = normalize_name(candidate);
            if name.is_empty() {
                continue;
            }
            if let Some(index) = self.fonts.index_of(&format!("{name}{style}")) {
                return Ok(index);
            }
            let target = if is_core_family(&name) {
                Some(name.as_str())
            } else {
                FONT_ALIASES
                    .iter()
                    .find(|(alias, _)| *alias == name)
                    .map(|(_, target)| *target)
            };
            if let Some(target) = target {
                let style = if matches!(target, "symbol" | "zapfdingbats") {
                    ""
                } else {
                    style.as_str()
                };
                return self.fonts.add_core(&format!("{target}{style}"), style);
            }
        }
        Err(PdfError::FontLookup(format!(
            "No suitable font for family='{family}', style='{style}'"
        )))
    }

    /// Builds a `/Resources` dictionary holding only the categories `usage` touches.
    pub(crate) fn resource_dict(
        &self,
        usage: &UsageSet,
        refs: &ResourceRefs,
        with_proc_set: bool,
    ) -> Result<Dict> {
        let mut dict = Dict::new();
        if with_proc_set {
            dict.set(
                "ProcSet",
                Value::Array(PROC_SET.iter().map(|name| Value::name(*name)).collect()),
            );
        }
        if usage.contains(ResourceKind::Font) {
            let mut fonts = Dict::new();
            for index in &usage.fonts {
                fonts.set(&format!("F{index}"), lookup(&refs.fonts, index, "font F")?);
            }
            dict.set("Font", fonts);
        }
        if usage.contains(ResourceKind::Image) {
            let mut images = Dict::new();
            for index in &usage.images {
                images.set(&format!("I{index}"), lookup(&refs.images, index, "image I")?);
            }
            dict.set("XObject", images);
        }
        if usage.contains(ResourceKind::GraphicsState) {
            let mut states = Dict::new();
            for (name, _) in self.graphics_styles() {
                if usage.graphics_states.contains(name) {
                    states.set(
                        name,
                        lookup(&refs.graphics_states, &name.to_string(), "graphics state ")?,
                    );
                }
            }
            for name in &usage.graphics_states {
                if states.get(name).is_none() {
                    return Err(PdfError::structural(format!(
                        "graphics state {name} is used but was never registered"
                    )));
                }
            }
            dict.set("ExtGState", states);
        }
        if usage.contains(ResourceKind::Shading) {
            let mut shadings = Dict::new();
            for name in &usage.shadings {
                shadings.set(name, lookup(&refs.shadings, name, "shading ")?);
            }
            dict.set("Shading", shadings);
        }
        if usage.contains(ResourceKind::Pattern) {
            let mut patterns = Dict::new();
            for name in &usage.patterns {
                patterns.set(name, lookup(&refs.patterns, name, "pattern ")?);
            }
            dict.set("Pattern", patterns);
        }
        Ok(dict)
    }
}

fn capture_text(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

fn capture_index(raw: &[u8]) -> Option<usize> {
    std::str::from_utf8(raw).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{ObjectGraph, PdfObject};
    use crate::shading::{ColorStop, GradientGeometry};
    use crate::types::Rgba;

    fn gradient(x1: f32) -> Gradient {
        Gradient {
            geometry: GradientGeometry::Axial {
                x0: 0.0,
                y0: 0.0,
                x1,
                y1: 0.0,
            },
            stops: vec![
                ColorStop {
                    offset: 0.0,
                    color: Rgba::BLACK,
                },
                ColorStop {
                    offset: 1.0,
                    color: Rgba::new(1.0, 1.0, 1.0, 1.0),
                },
            ],
            extend: true,
        }
    }

    #[test]
    fn scan_collects_every_operator_family() {
        let mut catalog = ResourceCatalog::new(true);
        let image = catalog.images_mut().preload_gray(1, 1, &[0]).unwrap();
        let content = format!(
            "q /GS0 gs /I{image} Do Q\nBT /F2 12.5 Tf (x) Tj ET\n/Pattern cs /P1 scn\n/P3  SCN\n/Sh1 sh"
        );
        catalog.scan(content.as_bytes(), 1);
        let usage = catalog.page_usage(1).unwrap();
        assert_eq!(usage.fonts, BTreeSet::from([2]));
        assert_eq!(usage.images, BTreeSet::from([image]));
        assert!(usage.graphics_states.contains("GS0"));
        assert_eq!(
            usage.patterns.iter().cloned().collect::<Vec<_>>(),
            vec!["P1".to_string(), "P3".to_string()]
        );
        assert!(usage.shadings.contains("Sh1"));
        assert_eq!(catalog.images().used().count(), 1);
    }

    #[test]
    fn font_selection_needs_a_size_operand() {
        let mut catalog = ResourceCatalog::new(true);
        catalog.scan(b"/F1 Tf /F4 -3 Tf", 1);
        assert_eq!(catalog.page_usage(1).unwrap().fonts, BTreeSet::from([4]));
    }

    #[test]
    fn families_resolve_through_aliases() {
        let mut catalog = ResourceCatalog::new(true);
        let arial = catalog.font_from_family("'Arial', sans-serif", "b").unwrap();
        assert_eq!(catalog.fonts().get(arial).unwrap().name(), "Helvetica-Bold");
        let again = catalog.font_from_family("helvetica", "B").unwrap();
        assert_eq!(again, arial);
        let mono = catalog.font_from_family("\"Unknown\", Consolas", "").unwrap();
        assert_eq!(catalog.fonts().get(mono).unwrap().name(), "Courier");
        let symbol = catalog.font_from_family("Symbol", "BI").unwrap();
        assert_eq!(catalog.fonts().get(symbol).unwrap().name(), "Symbol");
        assert_eq!(catalog.fonts().len(), 3);
    }

    #[test]
    fn family_lookup_failures() {
        let mut catalog = ResourceCatalog::new(true);
        let err = catalog.font_from_family("  ", "").unwrap_err();
        assert_eq!(err.to_string(), "font lookup failed: Empty font family");
        let err = catalog.font_from_family("Wingdings", "I").unwrap_err();
        assert!(err.to_string().contains("No suitable font for family='Wingdings', style='I'"));
    }

    #[test]
    fn global_names_are_stable_and_deduplicated() {
        let mut catalog = ResourceCatalog::new(true);
        let a = catalog.register(Resource::Shading(gradient(10.0)), Some(1));
        let b = catalog.register(Resource::Shading(gradient(10.0)), Some(2));
        let c = catalog.register(Resource::Shading(gradient(20.0)), None);
        assert_eq!((a.as_str(), b.as_str(), c.as_str()), ("Sh1", "Sh1", "Sh2"));
        let pattern = Pattern {
            gradient: gradient(5.0),
            matrix: Matrix::identity(),
        };
        assert_eq!(catalog.register(Resource::Pattern(pattern), Some(1)), "P1");
        let gs0 = catalog.add_graphics_style(GraphicsStyle::fill_alpha(0.5));
        let gs1 = catalog.add_graphics_style(GraphicsStyle::blend(BlendMode::Multiply));
        assert_eq!(catalog.add_graphics_style(GraphicsStyle::fill_alpha(0.5)), gs0);
        assert_eq!((gs0.as_str(), gs1.as_str()), ("GS0", "GS1"));
    }

    #[test]
    fn vector_masks_are_keyed_by_their_drawing() {
        let mask = |operators: &str| GraphicsStyle {
            soft_mask: Some(SoftMask::Vector(VectorSoftMask {
                bbox: Rect::new(0.0, 0.0, 10.0, 10.0),
                blend: BlendMode::Lighten,
                operators: operators.to_string(),
            })),
            ..GraphicsStyle::default()
        };
        let mut catalog = ResourceCatalog::new(true);
        let a = catalog.add_graphics_style(mask("1 g 0 0 5 5 re f"));
        let b = catalog.add_graphics_style(mask("1 g 5 5 5 5 re f"));
        assert_eq!(catalog.add_graphics_style(mask("1 g 0 0 5 5 re f")), a);
        assert_ne!(a, b);
        assert!(catalog.images().is_empty());
    }

    #[test]
    fn page_dictionaries_list_only_used_categories() {
        let mut catalog = ResourceCatalog::new(true);
        let font_a = catalog.font_from_family("helvetica", "").unwrap();
        let font_b = catalog.font_from_family("times", "").unwrap();
        let image = catalog.images_mut().preload_gray(1, 1, &[7]).unwrap();
        catalog.register(Resource::Font(font_a), Some(1));
        catalog.register(Resource::Image(image), Some(1));
        catalog.register(Resource::Font(font_b), Some(2));

        let mut graph = ObjectGraph::new();
        let mut refs = ResourceRefs::default();
        refs.fonts
            .insert(font_a, graph.add(PdfObject::dict(Dict::new()), None).unwrap());
        refs.fonts
            .insert(font_b, graph.add(PdfObject::dict(Dict::new()), None).unwrap());
        refs.images
            .insert(image, graph.add(PdfObject::dict(Dict::new()), None).unwrap());

        let first = catalog
            .resource_dict(catalog.page_usage(1).unwrap(), &refs, true)
            .unwrap();
        let keys: Vec<&str> = first.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["ProcSet", "Font", "XObject"]);

        let second = catalog
            .resource_dict(catalog.page_usage(2).unwrap(), &refs, true)
            .unwrap();
        let keys: Vec<&str> = second.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["ProcSet", "Font"]);
        match second.get("Font") {
            Some(Value::Dict(fonts)) => {
                assert_eq!(fonts.len(), 1);
                assert!(fonts.get(&format!("F{font_b}")).is_some());
            }
            other => panic!("unexpected font entry {other:?}"),
        }
    }

    #[test]
    fn unresolved_names_are_structural_errors() {
        let mut catalog = ResourceCatalog::new(true);
        catalog.register(Resource::Font(9), Some(1));
        let err = catalog
            .resource_dict(catalog.page_usage(1).unwrap(), &ResourceRefs::default(), false)
            .unwrap_err();
        assert!(matches!(err, PdfError::Structural(_)));
        assert!(err.to_string().contains("font F9"));
    }
}
