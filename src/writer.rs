//! Turns a [`Document`] into file bytes.
//!
//! Three phases run in order. Setup allocates every object. Plumbing fills
//! in the links between them once all ids exist. Serialize writes the
//! objects, the xref table and the trailer in one ordered pass.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use rayon::prelude::*;
use sha2::{Digest, Sha256};

use crate::debug::DebugLogger;
use crate::document::{
    Annotation, AnnotationKind, Destination, Document, FileId, LinkTarget, Page, PdfDate, ZoomMode,
};
use crate::embed::embed_font;
use crate::error::{PdfError, Result};
use crate::font::RegisteredFont;
use crate::images::{image_object, smask_object};
use crate::object::{Dict, ObjId, ObjectGraph, ObjectWriter, PdfObject, Value, fmt, hex_upper};
use crate::outline::build_tree;
use crate::perf::Span;
use crate::resources::{ResourceRefs, SoftMask, UsageSet};
use crate::type3::{Type3Font, embed_type3, render_type3};
use crate::types::Rect;

const SECTION_LABELS: &[&str] = &[
    "pages",
    "embedded_files",
    "file_spec",
    "images",
    "gfxstate",
    "pattern",
    "shading",
    "fonts",
    "document_outline",
];

const XPACKET_BEGIN: &str = "<?xpacket begin=\"\u{feff}\" id=\"W5M0MpCehiHzreSzNTczkc9d\"?>\n";
const XPACKET_END: &str = "\n<?xpacket end=\"w\"?>";

struct PageIds {
    page: ObjId,
    content: ObjId,
    annotations: Vec<ObjId>,
}

struct EmbeddedIds {
    basename: String,
    file_spec: ObjId,
    globally_enclosed: bool,
}

/// Ids allocated during setup, read by plumbing and serialize.
struct Layout {
    pages_root: ObjId,
    catalog: ObjId,
    pages: Vec<PageIds>,
    embedded: Vec<EmbeddedIds>,
    /// `(graphics state, soft-mask form)` pairs.
    soft_masks: Vec<(ObjId, ObjId)>,
    /// One per page, or the same shared id for every page.
    resources: Vec<ObjId>,
    outline: Option<(ObjId, Vec<ObjId>)>,
    metadata: Option<ObjId>,
    info: ObjId,
    encrypt: Option<ObjId>,
}

impl Document {
    /// Builds the complete file. A document without pages gets one blank page.
    pub fn output(&mut self) -> Result<Vec<u8>> {
        self.options.validate()?;
        let perf = self.options.perf.clone();
        let debug = self.options.debug.clone();
        if self.pages.is_empty() {
            self.add_page();
        }

        let setup_span = Span::start(perf.as_ref(), "setup");
        let type3 = self.render_color_fonts(debug.as_ref())?;
        self.mark_soft_mask_images();
        let version = self.effective_version(&type3);
        let contents = self.content_objects()?;
        let prepared_id = self.prepare_security();
        let mut graph = ObjectGraph::new();
        let layout = self.setup(&mut graph, contents, &type3, debug.as_ref())?;
        drop(setup_span);

        {
            let _span = Span::start(perf.as_ref(), "plumbing");
            graph.begin_plumbing();
            self.plumb(&mut graph, &layout, &version)?;
        }

        let (mut buffer, sections) = {
            let _span = Span::start(perf.as_ref(), "serialize");
            graph.begin_serialize();
            self.serialize(&graph, &layout, &version, prepared_id)?
        };

        if let Some(signer) = &self.signer {
            let _span = Span::start(perf.as_ref(), "sign");
            buffer = signer.sign(buffer)?;
        }

        if let Some(perf) = &perf {
            perf.log_sections(&sections);
        }
        if let Some(debug) = &debug {
            debug.event(
                "document.output",
                &[
                    ("pages", self.pages.len().to_string()),
                    ("objects", graph.len().to_string()),
                    ("bytes", buffer.len().to_string()),
                    ("version", version),
                ],
            );
            debug.emit_summary("output");
        }
        Ok(buffer)
    }

    pub fn write_to(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.output()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Fonts selected by any page, in index order.
    fn used_fonts(&self) -> BTreeSet<usize> {
        self.pages
            .iter()
            .filter_map(|page| self.catalog.page_usage(page.index))
            .flat_map(|usage| usage.fonts.iter().copied())
            .collect()
    }

    /// Type3 programs register images, graphics states and patterns, so
    /// they are compiled before any resource object is allocated.
    fn render_color_fonts(&mut self, debug: Option<&DebugLogger>) -> Result<BTreeMap<usize, Type3Font>> {
        let mut rendered = BTreeMap::new();
        for index in self.used_fonts() {
            let font = match self.catalog.fonts.get(index) {
                Some(RegisteredFont::TrueType(font)) if font.color.is_some() => font.clone(),
                _ => continue,
            };
            let type3 = render_type3(&font, &mut self.catalog, self.options.text_color, debug)?;
            rendered.insert(index, type3);
        }
        Ok(rendered)
    }

    fn mark_soft_mask_images(&mut self) {
        let masks: Vec<usize> = self
            .catalog
            .graphics_styles()
            .filter_map(|(_, style)| style.soft_mask.as_ref().and_then(SoftMask::image))
            .collect();
        for image in masks {
            self.catalog.images.mark_used(image);
        }
    }

    fn effective_version(&self, type3: &BTreeMap<usize, Type3Font>) -> String {
        let transparent_images = self.options.allow_images_transparency
            && self.catalog.images.used().any(|info| info.smask.is_some());
        let transparency = transparent_images || type3.values().any(|font| font.transparency);
        if transparency && self.options.pdf_version == "1.3" {
            "1.4".to_string()
        } else {
            self.options.pdf_version.clone()
        }
    }

    fn content_objects(&self) -> Result<Vec<PdfObject>> {
        let compress = self.options.compress;
        let build = |page: &Page| PdfObject::content(Dict::new(), &page.content, compress);
        if compress && self.options.parallel_compression {
            self.pages.par_iter().map(build).collect()
        } else {
            self.pages.iter().map(build).collect()
        }
    }

    /// Hands the file identifier to the security handler. Encryption keys
    /// depend on it, so it cannot wait for the file digest.
    fn prepare_security(&mut self) -> Option<String> {
        let handler = self.security.as_mut()?;
        let id = match &self.options.file_id {
            FileId::Fixed(id) => id.clone(),
            FileId::Auto | FileId::Disabled => digest_id(&[], self.options.creation_date),
        };
        handler.prepare(&id);
        Some(id)
    }

    fn setup(
        &self,
        graph: &mut ObjectGraph,
        contents: Vec<PdfObject>,
        type3: &BTreeMap<usize, Type3Font>,
        debug: Option<&DebugLogger>,
    ) -> Result<Layout> {
        let pages_root = graph.add(PdfObject::dict(Dict::typed("Pages")), None)?;
        let catalog = graph.add(PdfObject::dict(Dict::typed("Catalog")), None)?;

        let mut pages = Vec::with_capacity(self.pages.len());
        for content in contents {
            let page = graph.add(PdfObject::dict(Dict::typed("Page")), Some("pages"))?;
            let content = graph.add(content, Some("pages"))?;
            pages.push(PageIds {
                page,
                content,
                annotations: Vec::new(),
            });
        }
        for (ids, page) in pages.iter_mut().zip(&self.pages) {
            for _ in &page.annotations {
                let id = graph.add(PdfObject::dict(Dict::typed("Annot")), Some("pages"))?;
                ids.annotations.push(id);
            }
        }

        let embedded = self.setup_embedded_files(graph)?;
        let (refs, soft_masks) = self.setup_resources(graph, type3, debug)?;

        let resources = if self.options.single_resources_object {
            let mut usage = self.catalog.all_usage();
            usage.fonts.retain(|index| refs.fonts.contains_key(index));
            let dict = self.catalog.resource_dict(&usage, &refs, true)?;
            let shared = graph.add(PdfObject::dict(dict), None)?;
            vec![shared; self.pages.len()]
        } else {
            let empty = UsageSet::default();
            let mut ids = Vec::with_capacity(self.pages.len());
            for page in &self.pages {
                let usage = self.catalog.page_usage(page.index).unwrap_or(&empty);
                let dict = self.catalog.resource_dict(usage, &refs, true)?;
                ids.push(graph.add(PdfObject::dict(dict), None)?);
            }
            ids
        };

        let outline = if self.outline.is_empty() {
            None
        } else {
            let root = graph.add(
                PdfObject::dict(Dict::typed("Outlines")),
                Some("document_outline"),
            )?;
            let mut items = Vec::with_capacity(self.outline.len());
            for section in &self.outline {
                let dict = Dict::new().with("Title", Value::text(section.name.as_str()));
                items.push(graph.add(PdfObject::dict(dict), Some("document_outline"))?);
            }
            Some((root, items))
        };

        let metadata = match &self.xmp_metadata {
            Some(xmp) => {
                let packet = format!("{XPACKET_BEGIN}{xmp}{XPACKET_END}");
                let dict = Dict::typed("Metadata").with("Subtype", Value::name("XML"));
                Some(graph.add(PdfObject::stream(dict, packet.into_bytes()), None)?)
            }
            None => None,
        };

        let info = graph.add(PdfObject::dict(self.info_dict()), None)?;

        let encrypt = match &self.security {
            Some(handler) => {
                let mut object = PdfObject::dict(handler.encryption_dict());
                object.plain = true;
                Some(graph.add(object, None)?)
            }
            None => None,
        };

        Ok(Layout {
            pages_root,
            catalog,
            pages,
            embedded,
            soft_masks,
            resources,
            outline,
            metadata,
            info,
            encrypt,
        })
    }

    fn setup_embedded_files(&self, graph: &mut ObjectGraph) -> Result<Vec<EmbeddedIds>> {
        let mut out = Vec::with_capacity(self.embedded_files.len());
        for file in &self.embedded_files {
            let mut params = Dict::new().with("Size", Value::Int(file.bytes.len() as i64));
            if let Some(date) = file.creation_date {
                params.set("CreationDate", Value::text(date.to_pdf_string()));
            }
            if let Some(date) = file.modification_date {
                params.set("ModDate", Value::text(date.to_pdf_string()));
            }
            let dict = Dict::typed("EmbeddedFile").with("Params", params);
            let stream = graph.add(
                PdfObject::content(dict, &file.bytes, self.options.compress)?,
                Some("embedded_files"),
            )?;

            let mut spec = Dict::typed("Filespec")
                .with("F", Value::text(file.basename.as_str()))
                .with("UF", Value::text(file.basename.as_str()))
                .with("EF", Dict::new().with("F", stream).with("UF", stream));
            if let Some(description) = &file.description {
                spec.set("Desc", Value::text(description.as_str()));
            }
            let file_spec = graph.add(PdfObject::dict(spec), Some("file_spec"))?;
            out.push(EmbeddedIds {
                basename: file.basename.clone(),
                file_spec,
                globally_enclosed: file.globally_enclosed,
            });
        }
        Ok(out)
    }

    fn setup_resources(
        &self,
        graph: &mut ObjectGraph,
        type3: &BTreeMap<usize, Type3Font>,
        debug: Option<&DebugLogger>,
    ) -> Result<(ResourceRefs, Vec<(ObjId, ObjId)>)> {
        let compress = self.options.compress;
        let mut refs = ResourceRefs::default();

        for info in self.catalog.images.used() {
            let id = graph.add(image_object(info), Some("images"))?;
            if let (Some(alpha), true) = (&info.smask, self.options.allow_images_transparency) {
                let mask = graph.add(smask_object(info, alpha), Some("images"))?;
                graph.dict_mut(id)?.set("SMask", mask);
            }
            refs.images.insert(info.index, id);
        }

        for (name, style) in self.catalog.graphics_styles() {
            let id = graph.add(PdfObject::dict(style.ext_gstate_dict()), Some("gfxstate"))?;
            refs.graphics_states.insert(name.to_string(), id);
        }

        for (name, pattern) in self.catalog.patterns() {
            let id = graph.add(PdfObject::dict(pattern.pattern_dict()), Some("pattern"))?;
            refs.patterns.insert(name.to_string(), id);
        }

        for index in self.used_fonts() {
            let id = match (type3.get(&index), self.catalog.fonts.get(index)) {
                (Some(font), _) => embed_type3(graph, font, &self.catalog, &refs, compress)?,
                (None, Some(font)) => embed_font(graph, font, compress, debug)?,
                (None, None) => {
                    return Err(PdfError::structural(format!(
                        "font F{index} is used but was never registered"
                    )));
                }
            };
            refs.fonts.insert(index, id);
        }

        for (name, gradient) in self.catalog.shadings() {
            let id = graph.add(PdfObject::dict(gradient.shading_dict()), Some("shading"))?;
            refs.shadings.insert(name.to_string(), id);
        }

        let mut soft_masks = Vec::new();
        for (name, style) in self.catalog.graphics_styles() {
            let Some(mask) = &style.soft_mask else {
                continue;
            };
            let (resources, content) = match mask {
                SoftMask::Image(mask) => {
                    let image = refs.images.get(&mask.image).copied().ok_or_else(|| {
                        PdfError::structural(format!("soft mask image I{} has no object", mask.image))
                    })?;
                    (
                        Dict::new().with("XObject", Dict::new().with(&format!("I{}", mask.image), image)),
                        format!("q {} cm /I{} Do Q", mask.matrix.operands(), mask.image),
                    )
                }
                SoftMask::Vector(mask) => (
                    Dict::new().with(
                        "ExtGState",
                        Dict::new().with(
                            "Cov",
                            Dict::typed("ExtGState").with("BM", Value::name(mask.blend.pdf_name())),
                        ),
                    ),
                    mask.operators.clone(),
                ),
            };
            let dict = Dict::typed("XObject")
                .with("Subtype", Value::name("Form"))
                .with("FormType", Value::Int(1))
                .with("BBox", rect_value(mask.bbox()))
                .with(
                    "Group",
                    Dict::typed("Group")
                        .with("S", Value::name("Transparency"))
                        .with("CS", Value::name("DeviceGray")),
                )
                .with("Resources", resources);
            let form = graph.add(
                PdfObject::content(dict, content.as_bytes(), compress)?,
                Some("gfxstate"),
            )?;
            let state = refs.graphics_states.get(name).copied().ok_or_else(|| {
                PdfError::structural(format!("graphics state {name} has no object"))
            })?;
            soft_masks.push((state, form));
        }

        Ok((refs, soft_masks))
    }

    fn info_dict(&self) -> Dict {
        let meta = &self.metadata;
        let mut info = Dict::new();
        for (key, value) in [
            ("Title", &meta.title),
            ("Subject", &meta.subject),
            ("Author", &meta.author),
            ("Keywords", &meta.keywords),
            ("Creator", &meta.creator),
        ] {
            if let Some(value) = value {
                info.set(key, Value::text(value.as_str()));
            }
        }
        let producer = meta
            .producer
            .clone()
            .unwrap_or_else(|| format!("pagewright {}", env!("CARGO_PKG_VERSION")));
        info.set("Producer", Value::text(producer));
        if let Some(date) = self.options.creation_date {
            info.set("CreationDate", Value::text(date.to_pdf_string()));
        }
        info
    }

    fn plumb(&self, graph: &mut ObjectGraph, layout: &Layout, version: &str) -> Result<()> {
        let page_refs: Vec<String> = layout.pages.iter().map(|ids| ids.page.reference()).collect();
        let default_box = self.options.default_page_size.media_box();

        {
            let root = graph.dict_mut(layout.pages_root)?;
            root.set("Kids", Value::refs(layout.pages.iter().map(|ids| ids.page)));
            root.set("Count", Value::Int(layout.pages.len() as i64));
            root.set("MediaBox", Value::raw(default_box.as_str()));
        }

        for ((ids, page), resources) in layout.pages.iter().zip(&self.pages).zip(&layout.resources) {
            {
                let dict = graph.dict_mut(ids.page)?;
                dict.set("Parent", layout.pages_root);
                let media_box = page.size.media_box();
                if media_box != default_box {
                    dict.set("MediaBox", Value::raw(media_box));
                }
                dict.set("Resources", *resources);
                dict.set("Contents", ids.content);
                if !ids.annotations.is_empty() {
                    dict.set("Annots", Value::refs(ids.annotations.iter().copied()));
                }
                if version != "1.3" {
                    dict.set(
                        "Group",
                        Dict::typed("Group")
                            .with("S", Value::name("Transparency"))
                            .with("CS", Value::name("DeviceRGB")),
                    );
                }
            }
            for (annot_id, annotation) in ids.annotations.iter().zip(&page.annotations) {
                let body = self.annotation_dict(annotation, ids.page, &page_refs)?;
                *graph.dict_mut(*annot_id)? = body;
            }
        }

        if let Some((root, items)) = &layout.outline {
            let tree = build_tree(&self.outline);
            let item = |idx: Option<usize>| idx.map(|idx| items[idx]);
            {
                let dict = graph.dict_mut(*root)?;
                if let Some(first) = item(tree.root.first) {
                    dict.set("First", first);
                }
                if let Some(last) = item(tree.root.last) {
                    dict.set("Last", last);
                }
                dict.set("Count", Value::Int(tree.root.count as i64));
            }
            for ((section, links), id) in self.outline.iter().zip(&tree.items).zip(items) {
                let dest = resolve_destination(&section.dest, &page_refs)?;
                let dict = graph.dict_mut(*id)?;
                dict.set("Parent", item(links.parent).unwrap_or(*root));
                if let Some(prev) = item(links.prev) {
                    dict.set("Prev", prev);
                }
                if let Some(next) = item(links.next) {
                    dict.set("Next", next);
                }
                if let Some(first) = item(links.first) {
                    dict.set("First", first);
                }
                if let Some(last) = item(links.last) {
                    dict.set("Last", last);
                }
                if links.count > 0 {
                    dict.set("Count", Value::Int(links.count as i64));
                }
                dict.set("Dest", dest);
            }
        }

        for (state, form) in &layout.soft_masks {
            graph.dict_mut(*state)?.set(
                "SMask",
                Dict::typed("Mask")
                    .with("S", Value::name("Luminosity"))
                    .with("G", *form),
            );
        }

        let catalog = self.catalog_dict(layout, &page_refs)?;
        *graph.dict_mut(layout.catalog)? = catalog;
        Ok(())
    }

    fn annotation_dict(
        &self,
        annotation: &Annotation,
        page: ObjId,
        page_refs: &[String],
    ) -> Result<Dict> {
        let mut dict = Dict::typed("Annot");
        match &annotation.kind {
            AnnotationKind::Link(target) => {
                dict.set("Subtype", Value::name("Link"));
                dict.set("Rect", rect_value(annotation.rect));
                dict.set("Border", Value::raw("[0 0 0]"));
                match target {
                    LinkTarget::Destination(dest) => {
                        dict.set("Dest", resolve_destination(dest, page_refs)?);
                    }
                    LinkTarget::Named(name) => {
                        if !self.named_destinations.contains_key(name) {
                            return Err(PdfError::structural(format!(
                                "link to undeclared named destination {name:?}"
                            )));
                        }
                        dict.set("Dest", Value::text(name.as_str()));
                    }
                    LinkTarget::Uri(uri) => {
                        dict.set(
                            "A",
                            Dict::typed("Action")
                                .with("S", Value::name("URI"))
                                .with("URI", Value::text(uri.as_str())),
                        );
                    }
                }
            }
            AnnotationKind::Signature { field_name } => {
                dict.set("Subtype", Value::name("Widget"));
                dict.set("Rect", rect_value(annotation.rect));
                dict.set("FT", Value::name("Sig"));
                dict.set("T", Value::text(field_name.as_str()));
                // Print | Locked
                dict.set("F", Value::Int(132));
                dict.set("P", page);
            }
        }
        if let Some(contents) = &annotation.contents {
            dict.set("Contents", Value::text(contents.as_str()));
        }
        Ok(dict)
    }

    fn catalog_dict(&self, layout: &Layout, page_refs: &[String]) -> Result<Dict> {
        let mut catalog = Dict::typed("Catalog").with("Pages", layout.pages_root);
        if let Some(action) = page_refs
            .first()
            .and_then(|first| open_action(self.options.zoom_mode, first))
        {
            catalog.set("OpenAction", Value::raw(action));
        }
        if let Some(page_layout) = self.options.page_layout {
            catalog.set("PageLayout", Value::name(page_layout.pdf_name()));
        }
        if let Some(mode) = self.options.page_mode {
            catalog.set("PageMode", Value::name(mode.pdf_name()));
        }
        if let Some(lang) = &self.options.lang {
            catalog.set("Lang", Value::text(lang.as_str()));
        }
        if let Some((root, _)) = &layout.outline {
            catalog.set("Outlines", *root);
        }
        if let Some(metadata) = layout.metadata {
            catalog.set("Metadata", metadata);
        }

        let signature = layout
            .pages
            .iter()
            .zip(&self.pages)
            .flat_map(|(ids, page)| ids.annotations.iter().zip(&page.annotations))
            .find(|(_, annotation)| matches!(annotation.kind, AnnotationKind::Signature { .. }))
            .map(|(id, _)| *id);
        if let Some(field) = signature {
            catalog.set(
                "AcroForm",
                Dict::new()
                    .with("Fields", Value::refs([field]))
                    .with("SigFlags", Value::Int(3)),
            );
        }

        let mut names = Dict::new();
        if !layout.embedded.is_empty() {
            let mut files: Vec<&EmbeddedIds> = layout.embedded.iter().collect();
            files.sort_by(|a, b| a.basename.cmp(&b.basename));
            let mut entries = Vec::with_capacity(files.len() * 2);
            for file in files {
                entries.push(Value::text(file.basename.as_str()));
                entries.push(Value::Ref(file.file_spec));
            }
            names.set("EmbeddedFiles", Dict::new().with("Names", Value::Array(entries)));
        }
        if !self.named_destinations.is_empty() {
            let mut entries = Vec::with_capacity(self.named_destinations.len() * 2);
            for (name, dest) in &self.named_destinations {
                let dest = dest.as_ref().ok_or_else(|| {
                    PdfError::structural(format!(
                        "named destination {name:?} was declared but never set"
                    ))
                })?;
                entries.push(Value::text(name.as_str()));
                entries.push(resolve_destination(dest, page_refs)?);
            }
            names.set("Dests", Dict::new().with("Names", Value::Array(entries)));
        }
        if !names.is_empty() {
            catalog.set("Names", names);
        }

        if self.pages.iter().any(|page| page.label.is_some()) {
            let mut nums = Vec::new();
            if self.pages.first().is_some_and(|page| page.label.is_none()) {
                nums.push(Value::Int(0));
                nums.push(Value::Dict(Dict::new()));
            }
            for (idx, page) in self.pages.iter().enumerate() {
                if let Some(label) = &page.label {
                    nums.push(Value::Int(idx as i64));
                    nums.push(Value::Dict(label.dict()));
                }
            }
            catalog.set("PageLabels", Dict::new().with("Nums", Value::Array(nums)));
        }

        let enclosed: Vec<ObjId> = layout
            .embedded
            .iter()
            .filter(|file| file.globally_enclosed)
            .map(|file| file.file_spec)
            .collect();
        if !enclosed.is_empty() {
            catalog.set("AF", Value::refs(enclosed));
        }
        Ok(catalog)
    }

    fn serialize(
        &self,
        graph: &ObjectGraph,
        layout: &Layout,
        version: &str,
        prepared_id: Option<String>,
    ) -> Result<(Vec<u8>, Vec<(String, usize)>)> {
        let mut out = Vec::new();
        out.extend_from_slice(format!("%PDF-{version}\n").as_bytes());
        out.extend_from_slice(b"%\xE9\xEB\xF1\xBF\n");

        let writer = ObjectWriter {
            security: self.security.as_deref(),
            max_id: graph.len(),
        };
        let mut offsets = Vec::with_capacity(graph.len());
        let mut section_bytes: HashMap<&str, usize> = HashMap::new();
        for (id, object, label) in graph.iter() {
            let start = out.len();
            offsets.push(start);
            out.extend_from_slice(format!("{} 0 obj\n", id.get()).as_bytes());
            writer.write_object(&mut out, id, object)?;
            out.extend_from_slice(b"\nendobj\n");
            if let Some(label) = label {
                *section_bytes.entry(label).or_insert(0) += out.len() - start;
            }
        }

        let file_id = match (&self.options.file_id, prepared_id) {
            (FileId::Fixed(id), _) => Some(format!("[{id}]")),
            (_, Some(id)) => Some(format!("[<{id}><{id}>]")),
            (FileId::Auto, None) => {
                let id = digest_id(&out, self.options.creation_date);
                Some(format!("[<{id}><{id}>]"))
            }
            (FileId::Disabled, None) => None,
        };

        let xref_start = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n", offsets.len() + 1).as_bytes());
        out.extend_from_slice(b"0000000000 65535 f \n");
        for offset in &offsets {
            out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }

        let mut trailer = format!(
            "trailer\n<< /Size {} /Root {} /Info {}",
            offsets.len() + 1,
            layout.catalog.reference(),
            layout.info.reference()
        );
        if let Some(encrypt) = layout.encrypt {
            trailer.push_str(&format!(" /Encrypt {}", encrypt.reference()));
        }
        if let Some(id) = file_id {
            trailer.push_str(&format!(" /ID {id}"));
        }
        trailer.push_str(&format!(" >>\nstartxref\n{xref_start}\n%%EOF\n"));
        out.extend_from_slice(trailer.as_bytes());

        let sections = SECTION_LABELS
            .iter()
            .filter_map(|label| section_bytes.get(label).map(|bytes| (label.to_string(), *bytes)))
            .collect();
        Ok((out, sections))
    }
}

fn resolve_destination(dest: &Destination, page_refs: &[String]) -> Result<Value> {
    let page_ref = dest
        .page_number
        .checked_sub(1)
        .and_then(|idx| page_refs.get(idx))
        .ok_or_else(|| {
            PdfError::structural(format!(
                "destination points to page {} but the document has {} pages",
                dest.page_number,
                page_refs.len()
            ))
        })?;
    Ok(Value::raw(dest.serialize(page_ref)))
}

fn open_action(mode: ZoomMode, first_page: &str) -> Option<String> {
    match mode {
        ZoomMode::FullPage => Some(format!("[{first_page} /Fit]")),
        ZoomMode::FullWidth => Some(format!("[{first_page} /FitH null]")),
        ZoomMode::Real => Some(format!("[{first_page} /XYZ null null 1]")),
        ZoomMode::Percent(percent) => Some(format!(
            "[{first_page} /XYZ null null {}]",
            fmt(percent / 100.0)
        )),
        ZoomMode::Default => None,
    }
}

fn rect_value(rect: Rect) -> Value {
    Value::reals(&[rect.x_min, rect.y_min, rect.x_max, rect.y_max])
}

/// First 16 bytes of the SHA-256 of `body` and the creation date, in hex.
fn digest_id(body: &[u8], date: Option<PdfDate>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body);
    if let Some(date) = date {
        hasher.update(date.to_pdf_string().as_bytes());
    }
    let digest = hasher.finalize();
    hex_upper(&digest[..16])
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::bitmap::{BitmapKind, build_strike};
    use crate::colr::build::{colr_v0, colr_v1, composite, glyph, solid};
    use crate::cpal::build_cpal;
    use crate::debug::DebugLogger;
    use crate::document::{
        DocumentOptions, EmbeddedFile, PageLabel, PageLabelStyle, Signer,
    };
    use crate::fixtures::FontBuilder;
    use crate::images::encode_png;
    use crate::object::SecurityHandler;
    use crate::perf::PerfLogger;
    use crate::sbix::build_sbix;
    use crate::types::Size;

    fn contains(haystack: &[u8], needle: &str) -> bool {
        haystack
            .windows(needle.len())
            .any(|window| window == needle.as_bytes())
    }

    fn plain_options() -> DocumentOptions {
        DocumentOptions::new().compress(false)
    }

    /// Reads the xref table back and checks every entry against the file.
    fn assert_xref_consistent(bytes: &[u8]) -> usize {
        let tail = bytes
            .windows(10)
            .rposition(|window| window == b"startxref\n")
            .unwrap();
        let trailer = std::str::from_utf8(&bytes[tail + 10..]).unwrap();
        let xref_start: usize = trailer.lines().next().unwrap().parse().unwrap();
        let mut lines = std::str::from_utf8(&bytes[xref_start..]).unwrap().lines();
        assert_eq!(lines.next(), Some("xref"));
        let header = lines.next().unwrap();
        let count: usize = header.strip_prefix("0 ").unwrap().parse().unwrap();
        assert_eq!(lines.next(), Some("0000000000 65535 f "));
        for id in 1..count {
            let line = lines.next().unwrap();
            assert_eq!(line.len(), 19);
            let offset: usize = line[..10].parse().unwrap();
            assert!(bytes[offset..].starts_with(format!("{id} 0 obj").as_bytes()));
        }
        assert!(contains(bytes, &format!("/Size {count} ")));
        count
    }

    #[test]
    fn empty_document_gets_one_page_and_a_consistent_xref() {
        let mut doc = Document::new(plain_options()).unwrap();
        let bytes = doc.output().unwrap();
        assert!(bytes.starts_with(b"%PDF-1.3\n%\xE9\xEB\xF1\xBF\n"));
        assert!(bytes.ends_with(b"%%EOF\n"));
        let size = assert_xref_consistent(&bytes);

        let parsed = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(parsed.get_pages().len(), 1);
        assert_eq!(
            parsed.trailer.get(b"Size").unwrap().as_i64().unwrap(),
            size as i64
        );
        assert!(contains(&bytes, "/OpenAction [3 0 R /FitH null]"));
        assert!(contains(&bytes, "/MediaBox [0 0 595.28 841.89]"));
        assert!(contains(&bytes, "/ID [<"));
    }

    #[test]
    fn pages_only_list_resources_they_use() {
        let mut doc = Document::new(DocumentOptions::default()).unwrap();
        let helvetica = doc.resources_mut().font_from_family("Helvetica", "").unwrap();
        let times = doc.resources_mut().font_from_family("Times", "").unwrap();
        let image = doc.preload_image(&encode_png(2, 2, &[200; 16])).unwrap();

        let first = doc.add_page();
        let text = doc.encode_text(helvetica, 12.0, "Hi").unwrap();
        doc.push_content(first, &format!("BT /F{helvetica} 12 Tf {text} Tj ET"))
            .unwrap();
        doc.push_content(first, &format!("q 10 0 0 10 0 0 cm /I{image} Do Q"))
            .unwrap();
        let second = doc.add_page_with_size(Size::letter()).unwrap();
        doc.push_content(second, &format!("BT /F{times} 12 Tf (Yo) Tj ET"))
            .unwrap();

        let bytes = doc.output().unwrap();
        assert_xref_consistent(&bytes);
        let parsed = lopdf::Document::load_mem(&bytes).unwrap();
        let pages = parsed.get_pages();
        let resources = |page: u32| {
            let page = parsed.get_dictionary(pages[&page]).unwrap();
            let id = page.get(b"Resources").unwrap().as_reference().unwrap();
            parsed.get_dictionary(id).unwrap().clone()
        };

        let first_res = resources(1);
        let fonts = first_res.get(b"Font").unwrap().as_dict().unwrap();
        assert!(fonts.has(format!("F{helvetica}").as_bytes()));
        assert!(!fonts.has(format!("F{times}").as_bytes()));
        let images = first_res.get(b"XObject").unwrap().as_dict().unwrap();
        assert!(images.has(format!("I{image}").as_bytes()));

        let second_res = resources(2);
        let fonts = second_res.get(b"Font").unwrap().as_dict().unwrap();
        assert!(fonts.has(format!("F{times}").as_bytes()));
        assert!(!second_res.has(b"XObject"));
        assert!(!second_res.has(b"ExtGState"));

        let content = parsed.get_page_content(pages[&1]).unwrap();
        assert_eq!(
            content,
            format!("BT /F{helvetica} 12 Tf (Hi) Tj ET\nq 10 0 0 10 0 0 cm /I{image} Do Q\n")
                .into_bytes()
        );
        let letter = parsed.get_dictionary(pages[&2]).unwrap();
        assert!(letter.has(b"MediaBox"));
        assert!(!parsed.get_dictionary(pages[&1]).unwrap().has(b"MediaBox"));
    }

    #[test]
    fn single_resources_object_is_shared() {
        let options = plain_options().single_resources_object(true);
        let mut doc = Document::new(options).unwrap();
        let font = doc.resources_mut().font_from_family("Courier", "B").unwrap();
        let first = doc.add_page();
        let second = doc.add_page();
        doc.push_content(first, &format!("BT /F{font} 9 Tf (a) Tj ET"))
            .unwrap();
        doc.push_content(second, "q Q").unwrap();

        let bytes = doc.output().unwrap();
        let parsed = lopdf::Document::load_mem(&bytes).unwrap();
        let pages = parsed.get_pages();
        let resource_of = |page: u32| {
            parsed
                .get_dictionary(pages[&page])
                .unwrap()
                .get(b"Resources")
                .unwrap()
                .as_reference()
                .unwrap()
        };
        assert_eq!(resource_of(1), resource_of(2));
        assert!(contains(&bytes, "/BaseFont /Courier-Bold"));
    }

    #[test]
    fn dangling_destinations_abort_the_build() {
        let mut doc = Document::new(plain_options()).unwrap();
        let page = doc.add_page();
        doc.add_link(
            page,
            Rect::new(0.0, 0.0, 10.0, 10.0),
            LinkTarget::Destination(Destination::new(5)),
        )
        .unwrap();
        assert!(matches!(doc.output(), Err(PdfError::Structural(_))));

        let mut doc = Document::new(plain_options()).unwrap();
        let page = doc.add_page();
        doc.add_named_destination("later");
        doc.add_link(
            page,
            Rect::new(0.0, 0.0, 10.0, 10.0),
            LinkTarget::Named("later".to_string()),
        )
        .unwrap();
        let err = doc.output().unwrap_err();
        assert!(err.to_string().contains("never set"));

        let mut doc = Document::new(plain_options()).unwrap();
        let page = doc.add_page();
        doc.add_link(
            page,
            Rect::new(0.0, 0.0, 10.0, 10.0),
            LinkTarget::Named("nowhere".to_string()),
        )
        .unwrap();
        assert!(matches!(doc.output(), Err(PdfError::Structural(_))));
    }

    #[test]
    fn catalog_links_outline_labels_and_names() {
        let mut doc = Document::new(plain_options().zoom_mode(ZoomMode::Percent(150.0))).unwrap();
        doc.add_page();
        let second = doc.add_page();
        doc.set_page_label(
            second,
            PageLabel {
                style: Some(PageLabelStyle::Decimal),
                prefix: None,
                start: Some(3),
            },
        )
        .unwrap();
        doc.set_named_destination("intro", Destination::new(second));
        doc.add_link(
            1,
            Rect::new(10.0, 10.0, 50.0, 20.0),
            LinkTarget::Named("intro".to_string()),
        )
        .unwrap();
        doc.add_link(
            1,
            Rect::new(10.0, 30.0, 50.0, 40.0),
            LinkTarget::Uri("https://example.com".to_string()),
        )
        .unwrap();
        doc.add_outline_section("Chapter", 0, Destination::new(1));
        doc.add_outline_section("Section", 1, Destination::at(second, 0.0, 700.0));

        let bytes = doc.output().unwrap();
        assert_xref_consistent(&bytes);
        // 1 pages root, 2 catalog, 3-4 first page, 5-6 second page.
        assert!(contains(&bytes, "/OpenAction [3 0 R /XYZ null null 1.5]"));
        assert!(contains(&bytes, "/PageLabels <</Nums [0 <<>> 1 <</S /D /St 3>>]>>"));
        assert!(contains(&bytes, "/Dests <</Names [(intro) [5 0 R /XYZ 0 null null]]>>"));
        assert!(contains(&bytes, "/Dest (intro)"));
        assert!(contains(&bytes, "/URI (https://example.com)"));
        assert!(contains(&bytes, "/Dest [5 0 R /XYZ 0 700 null]"));

        let parsed = lopdf::Document::load_mem(&bytes).unwrap();
        let root = parsed.trailer.get(b"Root").unwrap().as_reference().unwrap();
        let catalog = parsed.get_dictionary(root).unwrap();
        let outlines = catalog.get(b"Outlines").unwrap().as_reference().unwrap();
        let outlines = parsed.get_dictionary(outlines).unwrap();
        assert_eq!(outlines.get(b"Count").unwrap().as_i64().unwrap(), 1);
        let first = outlines.get(b"First").unwrap().as_reference().unwrap();
        let chapter = parsed.get_dictionary(first).unwrap();
        assert_eq!(chapter.get(b"Count").unwrap().as_i64().unwrap(), 1);
        let page = parsed.get_dictionary(parsed.get_pages()[&1]).unwrap();
        assert_eq!(page.get(b"Annots").unwrap().as_array().unwrap().len(), 2);
    }

    #[test]
    fn embedded_files_metadata_and_signature_field() {
        let options = plain_options()
            .lang("en-GB")
            .creation_date(PdfDate::new(2024, 5, 1, 8, 30, 0).unwrap());
        let mut doc = Document::new(options).unwrap();
        let page = doc.add_page();
        let mut file = EmbeddedFile::new("data.csv", b"a,b\n1,2\n".to_vec());
        file.description = Some("Raw numbers".to_string());
        doc.embed_file(file);
        doc.metadata_mut().title = Some("Quarterly".to_string());
        doc.set_xmp_metadata("<x:xmpmeta xmlns:x=\"adobe:ns:meta/\"/>");
        doc.add_annotation(
            page,
            Annotation {
                kind: AnnotationKind::Signature {
                    field_name: "Signature1".to_string(),
                },
                rect: Rect::new(0.0, 0.0, 0.0, 0.0),
                contents: None,
            },
        )
        .unwrap();

        let bytes = doc.output().unwrap();
        assert_xref_consistent(&bytes);
        assert!(contains(&bytes, "/EmbeddedFiles <</Names [(data.csv) "));
        assert!(contains(&bytes, "/Type /Filespec"));
        assert!(contains(&bytes, "/Desc (Raw numbers)"));
        assert!(contains(&bytes, "/SigFlags 3"));
        assert!(contains(&bytes, "/FT /Sig"));
        assert!(contains(&bytes, "/Lang (en-GB)"));
        assert!(contains(&bytes, "/Title (Quarterly)"));
        assert!(contains(&bytes, "/CreationDate (D:20240501083000Z00'00')"));
        assert!(contains(&bytes, "<?xpacket begin="));
        assert!(contains(&bytes, "/Producer (pagewright "));

        let parsed = lopdf::Document::load_mem(&bytes).unwrap();
        let root = parsed.trailer.get(b"Root").unwrap().as_reference().unwrap();
        let catalog = parsed.get_dictionary(root).unwrap();
        assert_eq!(catalog.get(b"AF").unwrap().as_array().unwrap().len(), 1);
        assert!(catalog.has(b"Metadata"));
    }

    #[test]
    fn color_fonts_become_type3_and_raise_the_version() {
        let data = FontBuilder::new()
            .glyph('A', 600)
            .glyph('B', 600)
            .table(*b"COLR", colr_v0(&[(1, vec![(2, 0)])]))
            .table(*b"CPAL", build_cpal(&[&[[0, 0, 255, 128]]]))
            .build();
        let mut doc = Document::new(DocumentOptions::default()).unwrap();
        let font = doc.add_font("Emoji", "", data).unwrap();
        let page = doc.add_page();
        let text = doc.encode_text(font, 24.0, "A").unwrap();
        doc.push_content(page, &format!("BT /F{font} 24 Tf {text} Tj ET"))
            .unwrap();

        let bytes = doc.output().unwrap();
        assert!(bytes.starts_with(b"%PDF-1.4\n"));
        assert!(contains(&bytes, "/Group <</Type /Group /S /Transparency /CS /DeviceRGB>>"));
        let parsed = lopdf::Document::load_mem(&bytes).unwrap();
        let page = parsed.get_dictionary(parsed.get_pages()[&1]).unwrap();
        let resources = page.get(b"Resources").unwrap().as_reference().unwrap();
        let resources = parsed.get_dictionary(resources).unwrap();
        let fonts = resources.get(b"Font").unwrap().as_dict().unwrap();
        let font_id = fonts
            .get(format!("F{font}").as_bytes())
            .unwrap()
            .as_reference()
            .unwrap();
        let font_dict = parsed.get_dictionary(font_id).unwrap();
        assert_eq!(font_dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Type3");
        let type3_resources = font_dict.get(b"Resources").unwrap().as_dict().unwrap();
        assert!(type3_resources.has(b"ExtGState"));
    }

    /// Renders `text` with a freshly added font and returns the parsed file
    /// together with that font's dictionary.
    fn single_font_document(
        data: Vec<u8>,
        text: &str,
        configure: impl FnOnce(&mut Document, usize),
    ) -> (lopdf::Document, lopdf::Dictionary) {
        let mut doc = Document::new(plain_options()).unwrap();
        let font = doc.add_font("Sample", "", data).unwrap();
        configure(&mut doc, font);
        let page = doc.add_page();
        let encoded = doc.encode_text(font, 24.0, text).unwrap();
        doc.push_content(page, &format!("BT /F{font} 24 Tf {encoded} Tj ET"))
            .unwrap();
        let bytes = doc.output().unwrap();
        assert_xref_consistent(&bytes);

        let parsed = lopdf::Document::load_mem(&bytes).unwrap();
        let page = parsed.get_dictionary(parsed.get_pages()[&1]).unwrap();
        let resources = page.get(b"Resources").unwrap().as_reference().unwrap();
        let font_id = parsed
            .get_dictionary(resources)
            .unwrap()
            .get(b"Font")
            .unwrap()
            .as_dict()
            .unwrap()
            .get(format!("F{font}").as_bytes())
            .unwrap()
            .as_reference()
            .unwrap();
        let font_dict = parsed.get_dictionary(font_id).unwrap().clone();
        (parsed, font_dict)
    }

    fn assert_bitmap_glyph_image(parsed: &lopdf::Document, font_dict: &lopdf::Dictionary) {
        assert_eq!(font_dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Type3");
        let resources = font_dict.get(b"Resources").unwrap().as_dict().unwrap();
        let images = resources.get(b"XObject").unwrap().as_dict().unwrap();
        assert_eq!(images.len(), 1);
        let (name, image) = images.iter().next().unwrap();
        assert!(name.starts_with(b"I"));
        let image = parsed.get_object(image.as_reference().unwrap()).unwrap();
        let image = image.as_stream().unwrap();
        assert_eq!(image.dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Image");

        let procs = font_dict.get(b"CharProcs").unwrap().as_dict().unwrap();
        let drawn = procs.iter().any(|(_, program)| {
            let program = parsed.get_object(program.as_reference().unwrap()).unwrap();
            let content = &program.as_stream().unwrap().content;
            let call = [b"/".as_slice(), name.as_slice(), b" Do"].concat();
            content.windows(call.len()).any(|window| window == call.as_slice())
        });
        assert!(drawn);
    }

    #[test]
    fn cbdt_glyph_images_reach_the_type3_resources() {
        let png = encode_png(1, 1, &[255, 0, 0, 255]);
        let mut payload = vec![4, 4, 0, 4, 4];
        payload.extend_from_slice(&(png.len() as u32).to_be_bytes());
        payload.extend_from_slice(&png);
        let (cblc, cbdt) = build_strike(BitmapKind::Color, 20, 32, 17, &[(1, payload)]);
        let data = FontBuilder::new()
            .glyph('A', 600)
            .table(*b"CBLC", cblc)
            .table(*b"CBDT", cbdt)
            .build();
        let (parsed, font_dict) = single_font_document(data, "A", |_, _| {});
        assert_bitmap_glyph_image(&parsed, &font_dict);
    }

    #[test]
    fn sbix_glyph_images_reach_the_type3_resources() {
        let png = encode_png(2, 2, &[255; 16]);
        let sbix = build_sbix(100, &[None, Some(((0, 0), *b"png ", png))]);
        let data = FontBuilder::new()
            .glyph('A', 600)
            .table(*b"sbix", sbix)
            .build();
        let (parsed, font_dict) = single_font_document(data, "A", |_, _| {});
        assert_bitmap_glyph_image(&parsed, &font_dict);
    }

    #[test]
    fn astral_characters_map_to_surrogate_pairs() {
        let data = FontBuilder::new().glyph('\u{1F600}', 600).build();
        let (parsed, font_dict) = single_font_document(data, "\u{1F600}", |_, _| {});
        assert_eq!(font_dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Type0");
        let to_unicode = font_dict.get(b"ToUnicode").unwrap().as_reference().unwrap();
        let cmap = parsed.get_object(to_unicode).unwrap().as_stream().unwrap();
        let cmap = String::from_utf8(cmap.content.clone()).unwrap();
        assert!(cmap.contains(" <D83DDE00>\n"), "{cmap}");
    }

    #[test]
    fn source_out_composites_become_luminosity_masks() {
        let paint = composite(solid(0, 1.0), 7, glyph(2, solid(1, 1.0)));
        let data = FontBuilder::new()
            .glyph('A', 600)
            .glyph('B', 600)
            .table(*b"COLR", colr_v1(&[(1, paint)], &[], &[]))
            .table(*b"CPAL", build_cpal(&[&[[0, 0, 255, 255], [255, 0, 0, 255]]]))
            .build();
        let (parsed, font_dict) = single_font_document(data, "A", |_, _| {});
        let resources = font_dict.get(b"Resources").unwrap().as_dict().unwrap();
        let states = resources.get(b"ExtGState").unwrap().as_dict().unwrap();
        let masked: Vec<_> = states
            .iter()
            .filter_map(|(_, state)| {
                let state = parsed.get_dictionary(state.as_reference().unwrap()).unwrap();
                state.get(b"SMask").ok().map(|mask| mask.as_dict().unwrap().clone())
            })
            .collect();
        assert_eq!(masked.len(), 1);
        assert_eq!(masked[0].get(b"S").unwrap().as_name().unwrap(), b"Luminosity");

        let form = parsed
            .get_object(masked[0].get(b"G").unwrap().as_reference().unwrap())
            .unwrap()
            .as_stream()
            .unwrap();
        let content = String::from_utf8(form.content.clone()).unwrap();
        assert!(content.starts_with("1 g\n"), "{content}");
        assert!(content.contains("/Cov gs\n0 g\n"), "{content}");
        let coverage = form
            .dict
            .get(b"Resources")
            .unwrap()
            .as_dict()
            .unwrap()
            .get(b"ExtGState")
            .unwrap()
            .as_dict()
            .unwrap()
            .get(b"Cov")
            .unwrap()
            .as_dict()
            .unwrap();
        assert_eq!(coverage.get(b"BM").unwrap().as_name().unwrap(), b"Darken");
    }

    #[test]
    fn palette_choice_survives_to_the_output() {
        let data = FontBuilder::new()
            .glyph('A', 600)
            .glyph('B', 600)
            .table(*b"COLR", colr_v0(&[(1, vec![(2, 0)])]))
            .table(*b"CPAL", build_cpal(&[&[[0, 0, 255, 255]], &[[0, 255, 0, 255]]]))
            .build();
        let (parsed, font_dict) = single_font_document(data, "A", |doc, font| {
            doc.set_font_palette(font, 1).unwrap()
        });
        let procs = font_dict.get(b"CharProcs").unwrap().as_dict().unwrap();
        let programs: Vec<String> = procs
            .iter()
            .map(|(_, program)| {
                let program = parsed.get_object(program.as_reference().unwrap()).unwrap();
                String::from_utf8(program.as_stream().unwrap().content.clone()).unwrap()
            })
            .collect();
        assert!(programs.iter().any(|program| program.contains("0 1 0 rg\n")));
        assert!(!programs.iter().any(|program| program.contains("0 0 1 rg\n")));
    }

    struct XorHandler {
        seen: String,
    }

    impl SecurityHandler for XorHandler {
        fn prepare(&mut self, file_id: &str) {
            self.seen = file_id.to_string();
        }

        fn encrypt_bytes(&self, data: &[u8], _obj_id: ObjId) -> Vec<u8> {
            data.iter().map(|b| b ^ 0xFF).collect()
        }

        fn encryption_dict(&self) -> Dict {
            Dict::new()
                .with("Filter", Value::name("Xor"))
                .with("Seen", Value::Literal(self.seen.clone()))
        }
    }

    #[test]
    fn security_handler_sees_the_file_id_and_encrypts_bodies() {
        let mut doc = Document::new(plain_options()).unwrap();
        let page = doc.add_page();
        doc.push_content(page, "BT ET").unwrap();
        doc.metadata_mut().title = Some("Secret".to_string());
        doc.set_security_handler(Box::new(XorHandler {
            seen: String::new(),
        }));

        let bytes = doc.output().unwrap();
        let id = digest_id(&[], None);
        assert!(contains(&bytes, &format!("/Seen ({id})")));
        assert!(contains(&bytes, &format!("/ID [<{id}><{id}>]")));
        assert!(contains(&bytes, "/Encrypt "));
        assert!(!contains(&bytes, "BT ET"));
        assert!(!contains(&bytes, "(Secret)"));
        assert_xref_consistent(&bytes);
    }

    struct Appender {
        calls: Arc<Mutex<usize>>,
    }

    impl Signer for Appender {
        fn sign(&self, mut buffer: Vec<u8>) -> Result<Vec<u8>> {
            *self.calls.lock().unwrap() += 1;
            buffer.extend_from_slice(b"%signed\n");
            Ok(buffer)
        }
    }

    #[test]
    fn signer_and_loggers_see_the_finished_file() {
        let perf = PerfLogger::in_memory();
        let debug = DebugLogger::in_memory();
        let options = DocumentOptions::new()
            .perf(perf.clone())
            .debug(debug.clone())
            .file_id(FileId::Fixed("<AB><CD>".to_string()));
        let mut doc = Document::new(options).unwrap();
        doc.add_page();
        let calls = Arc::new(Mutex::new(0));
        doc.set_signer(Box::new(Appender {
            calls: calls.clone(),
        }));

        let bytes = doc.output().unwrap();
        assert!(bytes.ends_with(b"%%EOF\n%signed\n"));
        assert_eq!(*calls.lock().unwrap(), 1);
        assert!(contains(&bytes, "/ID [<AB><CD>]"));

        let lines = perf.lines();
        for span in ["setup", "plumbing", "serialize", "sign"] {
            assert!(
                lines.iter().any(|line| line.contains(&format!("\"name\":\"{span}\""))),
                "missing span {span}"
            );
        }
        assert!(lines
            .iter()
            .any(|line| line.contains("perf.sections") && line.contains("\"pages\"")));
        assert!(debug
            .lines()
            .iter()
            .any(|line| line.contains("document.output")));
    }

    #[test]
    fn disabled_file_id_is_omitted_and_builds_are_deterministic() {
        let build = || {
            let mut doc = Document::new(plain_options().file_id(FileId::Disabled)).unwrap();
            let page = doc.add_page();
            doc.push_content(page, "0 0 m 10 10 l S").unwrap();
            doc.output().unwrap()
        };
        let first = build();
        assert!(!contains(&first, "/ID "));
        assert_eq!(first, build());
    }
}
