use std::collections::BTreeMap;

/// Registry/ordering/supplement triple of a CID font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ros {
    pub registry: String,
    pub ordering: String,
    pub supplement: i64,
}

impl Default for Ros {
    fn default() -> Self {
        Self {
            registry: "Adobe".to_string(),
            ordering: "Identity".to_string(),
            supplement: 0,
        }
    }
}

/// UTF-16BE hex for one code point, surrogate pairs above the BMP.
pub(crate) fn utf16_hex(cp: u32) -> String {
    if cp > 0xFFFF {
        let high = 0xD800 | ((cp - 0x1_0000) >> 10);
        let low = 0xDC00 | (cp & 0x3FF);
        format!("{:04X}{:04X}", high, low)
    } else {
        format!("{:04X}", cp)
    }
}

/// ToUnicode CMap for the used codes. `code_bytes` is 1 for Type3, 2 for CID fonts.
/// Codes without a Unicode value are left out.
pub(crate) fn to_unicode_cmap(entries: &BTreeMap<u32, Vec<u32>>, code_bytes: usize) -> String {
    let mut bfchar = String::new();
    let mut count = 0usize;
    for (code, unicode) in entries {
        if unicode.is_empty() {
            continue;
        }
        let target: String = unicode.iter().map(|cp| utf16_hex(*cp)).collect();
        if code_bytes == 1 {
            bfchar.push_str(&format!("<{:02X}> <{}>\n", code, target));
        } else {
            bfchar.push_str(&format!("<{:04X}> <{}>\n", code, target));
        }
        count += 1;
    }
    let codespace = if code_bytes == 1 {
        "<00> <FF>"
    } else {
        "<0000> <FFFF>"
    };
    format!(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo\n\
         <</Registry (Adobe)\n\
         /Ordering (UCS)\n\
         /Supplement 0\n\
         >> def\n\
         /CMapName /Adobe-Identity-UCS def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n\
         {codespace}\n\
         endcodespacerange\n\
         {count} beginbfchar\n\
         {bfchar}\
         endbfchar\n\
         endcmap\n\
         CMapName currentdict /CMap defineresource pop\n\
         end\n\
         end"
    )
}

pub(crate) fn cmap_name(ros: &Ros) -> String {
    format!("{}-{}-UCS", ros.registry, ros.ordering)
}

/// Encoding CMap mapping 2-byte codes to CIDs for CFF-based descendants.
pub(crate) fn cid_encoding_cmap(ros: &Ros, code_to_cid: &BTreeMap<u32, u32>) -> String {
    let mut cidchar = String::new();
    for (code, cid) in code_to_cid {
        cidchar.push_str(&format!("<{:04X}> {}\n", code, cid));
    }
    format!(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo\n\
         <</Registry ({registry})\n\
         /Ordering ({ordering})\n\
         /Supplement {supplement}\n\
         >> def\n\
         /CMapName /{name} def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n\
         <0000> <FFFF>\n\
         endcodespacerange\n\
         {count} begincidchar\n\
         {cidchar}\
         endcidchar\n\
         endcmap\n\
         CMapName currentdict /CMap defineresource pop\n\
         end\n\
         end",
        registry = ros.registry,
        ordering = ros.ordering,
        supplement = ros.supplement,
        name = cmap_name(ros),
        count = code_to_cid.len(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supplementary_plane_uses_surrogates() {
        assert_eq!(utf16_hex(0x1F600), "D83DDE00");
        assert_eq!(utf16_hex(0x41), "0041");
        assert_eq!(utf16_hex(0x10FFFF), "DBFFDFFF");
    }

    #[test]
    fn bfchar_entries_for_two_byte_codes() {
        let mut entries = BTreeMap::new();
        entries.insert(1, vec![0x41]);
        entries.insert(2, vec![0x1F600]);
        entries.insert(3, vec![]);
        let cmap = to_unicode_cmap(&entries, 2);
        assert!(cmap.contains("<0000> <FFFF>\nendcodespacerange\n2 beginbfchar\n"));
        assert!(cmap.contains("<0001> <0041>\n"));
        assert!(cmap.contains("<0002> <D83DDE00>\n"));
        assert!(cmap.ends_with("endbfchar\nendcmap\nCMapName currentdict /CMap defineresource pop\nend\nend"));
    }

    #[test]
    fn one_byte_codespace_for_type3() {
        let mut entries = BTreeMap::new();
        entries.insert(0x20, vec![0x20]);
        let cmap = to_unicode_cmap(&entries, 1);
        assert!(cmap.contains("<00> <FF>"));
        assert!(cmap.contains("<20> <0020>"));
    }

    #[test]
    fn encoding_cmap_lists_cids() {
        let ros = Ros {
            registry: "Adobe".to_string(),
            ordering: "Japan1".to_string(),
            supplement: 6,
        };
        let mut map = BTreeMap::new();
        map.insert(1, 843);
        map.insert(2, 7);
        let cmap = cid_encoding_cmap(&ros, &map);
        assert!(cmap.contains("/CMapName /Adobe-Japan1-UCS def"));
        assert!(cmap.contains("/Supplement 6\n"));
        assert!(cmap.contains("2 begincidchar\n<0001> 843\n<0002> 7\nendcidchar"));
    }
}
