//! # PDF Serializer
//!
//! Takes a laid-out [`LayoutPage`] and writes a single-page PDF 1.7 file.
//!
//! The page recorder works top-down with y growing toward the bottom; PDF
//! places the origin at the bottom-left, so every y is flipped against the
//! page height here and nowhere else.
//!
//! Standard faces are written as Type1 Helvetica with WinAnsiEncoding.
//! TrueType faces are embedded as CIDFontType2 with Identity-H encoding,
//! producing 5 PDF objects per font: FontFile2, FontDescriptor, CIDFont,
//! ToUnicode CMap, and the root Type0 dictionary. The whole font file is
//! embedded.
//!
//! Output is deterministic: fonts and glyphs are collected into ordered maps
//! and no timestamps or random IDs are written, so the same page always
//! produces the same bytes.

pub mod image;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as FmtWrite;
use std::io::Write as IoWrite;

use miniz_oxide::deflate::compress_to_vec_zlib;

use crate::backend::{DrawCommand, LayoutElement, LayoutPage};
use crate::error::{InvoiceError, Result};
use crate::font::{FontContext, FontFace, LoadedFont, TrueTypeMetrics};
use crate::layout::Border;

use self::image::{decode_png, ImagePixelData, LoadedImage};

/// Document information dictionary entries.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub title: Option<String>,
    pub subject: Option<String>,
}

pub struct PdfWriter;

/// How text for a registered font is encoded in the content stream.
enum TextEncoding {
    WinAnsi,
    /// Glyph IDs as 2-byte hex, keyed by the characters drawn.
    Identity(BTreeMap<char, u16>),
}

struct FontResource {
    /// Resource name index, `/F{index}`.
    index: usize,
    obj_id: usize,
    encoding: TextEncoding,
}

/// Tracks allocated PDF objects during writing.
struct PdfBuilder {
    objects: Vec<PdfObject>,
    /// Faces resolve to the same resource when bold falls back to regular.
    fonts: BTreeMap<FontFace, FontResource>,
    /// XObject obj IDs for images in paint order, named /Im0, /Im1, ...
    image_objects: Vec<usize>,
}

struct PdfObject {
    data: Vec<u8>,
}

impl PdfBuilder {
    fn new() -> Self {
        // 0 = placeholder (PDF objects are 1-indexed), 1 = Catalog, 2 = Pages
        let objects = (0..3).map(|_| PdfObject { data: vec![] }).collect();
        Self {
            objects,
            fonts: BTreeMap::new(),
            image_objects: Vec::new(),
        }
    }

    fn push(&mut self, data: Vec<u8>) -> usize {
        let id = self.objects.len();
        self.objects.push(PdfObject { data });
        id
    }

    /// Push a FlateDecode stream object with extra dictionary entries.
    fn push_stream(&mut self, extra: &str, raw: &[u8]) -> usize {
        let compressed = compress_to_vec_zlib(raw, 6);
        let mut data: Vec<u8> = Vec::new();
        let _ = write!(
            data,
            "<< /Length {}{} /Filter /FlateDecode >>\nstream\n",
            compressed.len(),
            extra
        );
        data.extend_from_slice(&compressed);
        data.extend_from_slice(b"\nendstream");
        self.push(data)
    }

    fn font(&self, face: FontFace) -> Result<&FontResource> {
        self.fonts
            .get(&face)
            .ok_or_else(|| InvoiceError::Backend(format!("font {:?} was not registered", face)))
    }
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write a laid-out page to a PDF byte vector.
    pub fn write(
        &self,
        page: &LayoutPage,
        metadata: &Metadata,
        font_context: &FontContext,
    ) -> Result<Vec<u8>> {
        let mut builder = PdfBuilder::new();

        self.register_fonts(&mut builder, page, font_context)?;
        self.register_images(&mut builder, page)?;

        let content = self.build_content_stream(page, &builder)?;
        let content_obj_id = builder.push_stream("", content.as_bytes());

        let mut resources = format!("/Font << {} >>", Self::font_resource_dict(&builder));
        if !builder.image_objects.is_empty() {
            let _ = write!(resources, " /XObject << {} >>", Self::xobject_resource_dict(&builder));
        }
        let page_dict = format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
             /Contents {} 0 R /Resources << {} >> >>",
            page.width, page.height, content_obj_id, resources
        );
        let page_obj_id = builder.push(page_dict.into_bytes());

        builder.objects[1].data = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();
        builder.objects[2].data =
            format!("<< /Type /Pages /Kids [{} 0 R] /Count 1 >>", page_obj_id).into_bytes();

        let mut info = String::from("<< ");
        if let Some(ref title) = metadata.title {
            let _ = write!(info, "/Title {} ", Self::text_string(title));
        }
        if let Some(ref subject) = metadata.subject {
            let _ = write!(info, "/Subject {} ", Self::text_string(subject));
        }
        info.push_str("/Producer (taxslip) >>");
        let info_obj_id = builder.push(info.into_bytes());

        tracing::debug!(
            objects = builder.objects.len(),
            fonts = builder.fonts.len(),
            images = builder.image_objects.len(),
            "serialized PDF"
        );
        Ok(self.serialize(&builder, info_obj_id))
    }

    /// Build the content stream for the page in paint order.
    fn build_content_stream(&self, page: &LayoutPage, builder: &PdfBuilder) -> Result<String> {
        let mut stream = String::new();
        let mut image_counter = 0usize;
        for element in &page.elements {
            self.write_element(&mut stream, element, page.height, builder, &mut image_counter)?;
        }
        Ok(stream)
    }

    fn write_element(
        &self,
        stream: &mut String,
        element: &LayoutElement,
        page_height: f64,
        builder: &PdfBuilder,
        image_counter: &mut usize,
    ) -> Result<()> {
        match &element.draw {
            DrawCommand::Rect { border } => {
                if border.is_none() {
                    return Ok(());
                }
                let x = element.x;
                let y = page_height - element.y - element.height;
                Self::write_border(stream, x, y, element.width, element.height, border);
            }

            DrawCommand::Text {
                run,
                face,
                font_size,
            } => {
                if run.text.is_empty() {
                    return Ok(());
                }
                let font = builder.font(*face)?;
                let x = element.x;
                let y = page_height - element.y;
                let _ = write!(
                    stream,
                    "BT\n0 0 0 rg\n/F{} {:.2} Tf\n{:.2} {:.2} Td\n",
                    font.index, font_size, x, y
                );
                match &font.encoding {
                    TextEncoding::Identity(char_to_gid) => {
                        let mut hex = String::new();
                        for ch in run.text.chars() {
                            let gid = char_to_gid.get(&ch).copied().unwrap_or(0);
                            let _ = write!(hex, "{:04X}", gid);
                        }
                        let _ = writeln!(stream, "<{}> Tj", hex);
                    }
                    TextEncoding::WinAnsi => {
                        let _ = writeln!(stream, "({}) Tj", Self::encode_winansi(&run.text));
                    }
                }
                stream.push_str("ET\n");
            }

            DrawCommand::Image { .. } => {
                let img_idx = *image_counter;
                *image_counter += 1;
                let x = element.x;
                let y = page_height - element.y - element.height;
                let _ = write!(
                    stream,
                    "q\n{:.4} 0 0 {:.4} {:.2} {:.2} cm\n/Im{} Do\nQ\n",
                    element.width, element.height, x, y, img_idx
                );
            }
        }
        Ok(())
    }

    /// Stroke a cell outline. `x`/`y` are the PDF bottom-left corner.
    fn write_border(stream: &mut String, x: f64, y: f64, w: f64, h: f64, border: &Border) {
        let _ = write!(stream, "q\n0 0 0 RG\n{:.2} w\n", border.width);
        if border.top && border.right && border.bottom && border.left {
            let _ = write!(stream, "{:.2} {:.2} {:.2} {:.2} re\nS\n", x, y, w, h);
        } else {
            let mut line = |x0: f64, y0: f64, x1: f64, y1: f64| {
                let _ = write!(stream, "{:.2} {:.2} m\n{:.2} {:.2} l\nS\n", x0, y0, x1, y1);
            };
            if border.top {
                line(x, y + h, x + w, y + h);
            }
            if border.bottom {
                line(x, y, x + w, y);
            }
            if border.left {
                line(x, y, x, y + h);
            }
            if border.right {
                line(x + w, y, x + w, y + h);
            }
        }
        stream.push_str("Q\n");
    }

    /// Register the faces the page actually draws with. A bold face that
    /// falls back to the regular font shares its resource.
    fn register_fonts(
        &self,
        builder: &mut PdfBuilder,
        page: &LayoutPage,
        font_context: &FontContext,
    ) -> Result<()> {
        let shared = std::ptr::eq(
            font_context.font(FontFace::Regular),
            font_context.font(FontFace::Bold),
        );
        let canonical = |face: FontFace| if shared { FontFace::Regular } else { face };

        let mut used: BTreeMap<FontFace, BTreeSet<char>> = BTreeMap::new();
        for (_, run, face, _) in page.texts() {
            used.entry(canonical(face))
                .or_default()
                .extend(run.text.chars());
        }
        // An empty font dictionary is valid, but always register regular so
        // every page carries at least one font resource.
        used.entry(FontFace::Regular).or_default();

        for (index, (face, chars)) in used.iter().enumerate() {
            let resource = match font_context.font(*face) {
                LoadedFont::Standard(m) => {
                    let missing = Self::winansi_gaps(chars);
                    if !missing.is_empty() {
                        tracing::warn!(
                            font = m.font.pdf_name(),
                            characters = missing.len(),
                            sample = %missing.iter().take(8).collect::<String>(),
                            "standard font cannot encode these characters; drawing '?'. \
                             Supply a TrueType font for readable text"
                        );
                    }
                    let dict = format!(
                        "<< /Type /Font /Subtype /Type1 /BaseFont /{} \
                         /Encoding /WinAnsiEncoding >>",
                        m.font.pdf_name()
                    );
                    FontResource {
                        index,
                        obj_id: builder.push(dict.into_bytes()),
                        encoding: TextEncoding::WinAnsi,
                    }
                }
                LoadedFont::TrueType(m) => {
                    let (obj_id, char_to_gid) =
                        Self::write_custom_font_objects(builder, m, *face, chars)?;
                    FontResource {
                        index,
                        obj_id,
                        encoding: TextEncoding::Identity(char_to_gid),
                    }
                }
            };
            builder.fonts.insert(*face, resource);
        }

        if shared {
            if let Some(regular) = builder.fonts.get(&FontFace::Regular) {
                let alias = FontResource {
                    index: regular.index,
                    obj_id: regular.obj_id,
                    encoding: match &regular.encoding {
                        TextEncoding::WinAnsi => TextEncoding::WinAnsi,
                        TextEncoding::Identity(map) => TextEncoding::Identity(map.clone()),
                    },
                };
                builder.fonts.insert(FontFace::Bold, alias);
            }
        }
        Ok(())
    }

    /// Decode every image element and write its XObject, in paint order.
    fn register_images(&self, builder: &mut PdfBuilder, page: &LayoutPage) -> Result<()> {
        for element in &page.elements {
            if let DrawCommand::Image { png } = &element.draw {
                let image = decode_png(png)?;
                let obj_id = Self::write_image_xobject(builder, &image);
                builder.image_objects.push(obj_id);
            }
        }
        Ok(())
    }

    /// Write an image XObject (and its SMask when there is alpha) and return
    /// the main object ID.
    fn write_image_xobject(builder: &mut PdfBuilder, image: &LoadedImage) -> usize {
        let dict = |color_space: &str, extra: &str| {
            format!(
                " /Type /XObject /Subtype /Image /Width {} /Height {} \
                 /ColorSpace {} /BitsPerComponent 8{}",
                image.width_px, image.height_px, color_space, extra
            )
        };

        match &image.pixel_data {
            ImagePixelData::Gray(gray) => builder.push_stream(&dict("/DeviceGray", ""), gray),
            ImagePixelData::Rgb { rgb, alpha } => {
                let smask = alpha
                    .as_ref()
                    .map(|alpha| builder.push_stream(&dict("/DeviceGray", ""), alpha));
                let smask_ref = smask
                    .map(|id| format!(" /SMask {} 0 R", id))
                    .unwrap_or_default();
                builder.push_stream(&dict("/DeviceRGB", &smask_ref), rgb)
            }
        }
    }

    /// Write the 5 CIDFont PDF objects for an embedded TrueType face.
    /// Returns the Type0 object ID and the glyph map for content encoding.
    fn write_custom_font_objects(
        builder: &mut PdfBuilder,
        metrics: &TrueTypeMetrics,
        face_kind: FontFace,
        used_chars: &BTreeSet<char>,
    ) -> Result<(usize, BTreeMap<char, u16>)> {
        let face = ttf_parser::Face::parse(&metrics.data, 0).map_err(|e| {
            InvoiceError::Font(format!(
                "failed to parse TrueType data for '{}': {}",
                metrics.family, e
            ))
        })?;

        let mut char_to_gid: BTreeMap<char, u16> = BTreeMap::new();
        for &ch in used_chars {
            match metrics.glyph_id(ch) {
                Some(gid) => {
                    char_to_gid.insert(ch, gid);
                }
                None => tracing::warn!(
                    font = %metrics.family,
                    codepoint = %format!("U+{:04X}", ch as u32),
                    "character has no glyph; drawing .notdef"
                ),
            }
        }

        let pdf_font_name = Self::sanitize_font_name(&metrics.family, face_kind);
        let units_per_em = metrics.units_per_em;
        let scale = 1000.0 / units_per_em as f64;

        // 1. FontFile2 stream
        let fontfile2_id = builder.push_stream(
            &format!(" /Length1 {}", metrics.data.len()),
            &metrics.data,
        );

        // 2. FontDescriptor
        let bbox = face.global_bounding_box();
        let bbox_str = format!(
            "[{} {} {} {}]",
            (bbox.x_min as f64 * scale) as i32,
            (bbox.y_min as f64 * scale) as i32,
            (bbox.x_max as f64 * scale) as i32,
            (bbox.y_max as f64 * scale) as i32,
        );
        let cap_height = face.capital_height().unwrap_or(metrics.ascender) as f64 * scale;
        let stem_v = if face_kind == FontFace::Bold { 120 } else { 80 };
        let font_descriptor_dict = format!(
            "<< /Type /FontDescriptor /FontName /{} /Flags 4 \
             /FontBBox {} /ItalicAngle 0 \
             /Ascent {} /Descent {} /CapHeight {} /StemV {} \
             /FontFile2 {} 0 R >>",
            pdf_font_name,
            bbox_str,
            (metrics.ascender as f64 * scale) as i32,
            (metrics.descender as f64 * scale) as i32,
            cap_height as i32,
            stem_v,
            fontfile2_id,
        );
        let font_descriptor_id = builder.push(font_descriptor_dict.into_bytes());

        // 3. CIDFont dictionary (DescendantFont)
        let w_array = Self::build_w_array(&char_to_gid, metrics);
        // Unmapped characters paint as .notdef and were measured at its width.
        let default_width = (metrics.notdef_units() as f64 * scale) as u32;
        let cidfont_dict = format!(
            "<< /Type /Font /Subtype /CIDFontType2 /BaseFont /{} \
             /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> \
             /FontDescriptor {} 0 R /DW {} /W {} \
             /CIDToGIDMap /Identity >>",
            pdf_font_name, font_descriptor_id, default_width, w_array,
        );
        let cidfont_id = builder.push(cidfont_dict.into_bytes());

        // 4. ToUnicode CMap
        let cmap = Self::build_tounicode_cmap(&char_to_gid, &pdf_font_name);
        let tounicode_id = builder.push_stream("", cmap.as_bytes());

        // 5. Type0 font dictionary
        let type0_dict = format!(
            "<< /Type /Font /Subtype /Type0 /BaseFont /{} \
             /Encoding /Identity-H \
             /DescendantFonts [{} 0 R] \
             /ToUnicode {} 0 R >>",
            pdf_font_name, cidfont_id, tounicode_id,
        );
        let type0_id = builder.push(type0_dict.into_bytes());

        Ok((type0_id, char_to_gid))
    }

    /// Build the /W array for per-glyph widths: `[gid [width] gid [width] ...]`.
    fn build_w_array(char_to_gid: &BTreeMap<char, u16>, metrics: &TrueTypeMetrics) -> String {
        let scale = 1000.0 / metrics.units_per_em as f64;
        let entries: BTreeMap<u16, u32> = char_to_gid
            .iter()
            .map(|(&ch, &gid)| (gid, (metrics.advance_units(ch) as f64 * scale) as u32))
            .collect();

        let mut result = String::from("[");
        for (gid, width) in &entries {
            let _ = write!(result, " {} [{}]", gid, width);
        }
        result.push_str(" ]");
        result
    }

    /// Build a ToUnicode CMap so extracted text maps back to the drawn
    /// characters. Arabic runs map to their presentation forms.
    fn build_tounicode_cmap(char_to_gid: &BTreeMap<char, u16>, font_name: &str) -> String {
        let gid_to_unicode: BTreeMap<u16, u32> = char_to_gid
            .iter()
            .map(|(&ch, &gid)| (gid, ch as u32))
            .collect();
        let entries: Vec<(u16, u32)> = gid_to_unicode.into_iter().collect();

        let mut cmap = String::new();
        cmap.push_str("/CIDInit /ProcSet findresource begin\n");
        cmap.push_str("12 dict begin\n");
        cmap.push_str("begincmap\n");
        cmap.push_str("/CIDSystemInfo\n");
        cmap.push_str("<< /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
        let _ = writeln!(cmap, "/CMapName /{}-UTF16 def", font_name);
        cmap.push_str("/CMapType 2 def\n");
        cmap.push_str("1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n");

        // At most 100 entries per beginbfchar block.
        for chunk in entries.chunks(100) {
            let _ = writeln!(cmap, "{} beginbfchar", chunk.len());
            for &(gid, unicode) in chunk {
                let _ = writeln!(cmap, "<{:04X}> <{:04X}>", gid, unicode);
            }
            cmap.push_str("endbfchar\n");
        }

        cmap.push_str("endcmap\n");
        cmap.push_str("CMapName currentdict /CMap defineresource pop\n");
        cmap.push_str("end\nend\n");
        cmap
    }

    /// Sanitize a family name for use as a PDF name object.
    fn sanitize_font_name(family: &str, face: FontFace) -> String {
        let mut name: String = family
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        if name.is_empty() {
            name = "Embedded".to_string();
        }
        if face == FontFace::Bold {
            name.push_str("-Bold");
        }
        name
    }

    fn font_resource_dict(builder: &PdfBuilder) -> String {
        let mut entries: BTreeMap<usize, usize> = BTreeMap::new();
        for font in builder.fonts.values() {
            entries.insert(font.index, font.obj_id);
        }
        entries
            .iter()
            .map(|(idx, obj_id)| format!("/F{} {} 0 R", idx, obj_id))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn xobject_resource_dict(builder: &PdfBuilder) -> String {
        builder
            .image_objects
            .iter()
            .enumerate()
            .map(|(idx, obj_id)| format!("/Im{} {} 0 R", idx, obj_id))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// A PDF text string: literal for printable ASCII, UTF-16BE hex otherwise.
    fn text_string(s: &str) -> String {
        if s.chars().all(|c| (' '..='~').contains(&c)) {
            return format!("({})", Self::escape_pdf_string(s));
        }
        let mut hex = String::from("<FEFF");
        for unit in s.encode_utf16() {
            let _ = write!(hex, "{:04X}", unit);
        }
        hex.push('>');
        hex
    }

    fn escape_pdf_string(s: &str) -> String {
        s.replace('\\', "\\\\")
            .replace('(', "\\(")
            .replace(')', "\\)")
    }

    /// Characters a WinAnsi font will paint as `?`.
    fn winansi_gaps(chars: &BTreeSet<char>) -> Vec<char> {
        chars
            .iter()
            .copied()
            .filter(|ch| Self::unicode_to_winansi(*ch).is_none())
            .collect()
    }

    /// Encode text for a WinAnsi literal string, substituting `?` for
    /// characters outside Windows-1252.
    fn encode_winansi(text: &str) -> String {
        let mut out = String::new();
        for ch in text.chars() {
            let b = Self::unicode_to_winansi(ch).unwrap_or(b'?');
            match b {
                b'\\' => out.push_str("\\\\"),
                b'(' => out.push_str("\\("),
                b')' => out.push_str("\\)"),
                0x20..=0x7E => out.push(b as char),
                _ => {
                    let _ = write!(out, "\\{:03o}", b);
                }
            }
        }
        out
    }

    /// Map a Unicode character to a WinAnsiEncoding (Windows-1252) byte.
    fn unicode_to_winansi(ch: char) -> Option<u8> {
        let cp = ch as u32;
        if (0x20..=0x7E).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
            return Some(cp as u8);
        }
        match cp {
            0x20AC => Some(0x80), // Euro sign
            0x201A => Some(0x82),
            0x0192 => Some(0x83),
            0x201E => Some(0x84),
            0x2026 => Some(0x85), // Horizontal ellipsis
            0x2020 => Some(0x86),
            0x2021 => Some(0x87),
            0x02C6 => Some(0x88),
            0x2030 => Some(0x89), // Per mille sign
            0x0160 => Some(0x8A),
            0x2039 => Some(0x8B),
            0x0152 => Some(0x8C),
            0x017D => Some(0x8E),
            0x2018 => Some(0x91),
            0x2019 => Some(0x92),
            0x201C => Some(0x93),
            0x201D => Some(0x94),
            0x2022 => Some(0x95), // Bullet
            0x2013 => Some(0x96), // En dash
            0x2014 => Some(0x97), // Em dash
            0x02DC => Some(0x98),
            0x2122 => Some(0x99),
            0x0161 => Some(0x9A),
            0x203A => Some(0x9B),
            0x0153 => Some(0x9C),
            0x017E => Some(0x9E),
            0x0178 => Some(0x9F),
            _ => None,
        }
    }

    /// Serialize all objects into the final PDF byte stream.
    fn serialize(&self, builder: &PdfBuilder, info_obj_id: usize) -> Vec<u8> {
        let mut output: Vec<u8> = Vec::new();
        let mut offsets: Vec<usize> = vec![0; builder.objects.len()];

        output.extend_from_slice(b"%PDF-1.7\n");
        output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

        for (i, obj) in builder.objects.iter().enumerate().skip(1) {
            offsets[i] = output.len();
            let _ = write!(output, "{} 0 obj\n", i);
            output.extend_from_slice(&obj.data);
            output.extend_from_slice(b"\nendobj\n\n");
        }

        let xref_offset = output.len();
        let _ = write!(output, "xref\n0 {}\n", builder.objects.len());
        let _ = write!(output, "0000000000 65535 f \n");
        for offset in offsets.iter().skip(1) {
            let _ = write!(output, "{:010} 00000 n \n", offset);
        }

        let _ = write!(
            output,
            "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            builder.objects.len(),
            info_obj_id,
            xref_offset
        );

        output
    }
}
