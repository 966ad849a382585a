use std::str::FromStr;

use serde::{Serialize, Serializer};

/// A character extracted from a PDF page with position and font info.
#[derive(Debug, Clone)]
pub struct PdfChar {
    pub ch: char,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub font_size: f32,
}

/// All characters on a single PDF page.
#[derive(Debug)]
pub struct PageChars {
    pub page_num: usize,
    pub width: f32,
    pub chars: Vec<PdfChar>,
}

/// A word: sequence of characters forming a unit.
#[derive(Debug, Clone)]
pub struct Word {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub font_size: f32,
}

impl Word {
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }
}

/// Axis-aligned rectangle in PDF user space (origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BoundingBox {
    /// Build a box from two corners, normalising so that `x0 <= x1` and `y0 <= y1`.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

/// One detected line of text inside a container.
#[derive(Debug, Clone)]
pub struct TextLine {
    pub text: String,
    pub bbox: BoundingBox,
    pub font_size: f32,
}

/// A group of consecutive lines forming a paragraph or column fragment.
#[derive(Debug, Clone)]
pub struct TextContainer {
    pub bbox: BoundingBox,
    pub lines: Vec<TextLine>,
}

impl TextContainer {
    pub fn from_lines(lines: Vec<TextLine>) -> Self {
        let bbox = lines
            .iter()
            .map(|l| l.bbox)
            .reduce(|acc, b| acc.union(&b))
            .unwrap_or(BoundingBox::new(0.0, 0.0, 0.0, 0.0));
        Self { bbox, lines }
    }
}

/// The text containers of a single page, in layout order.
#[derive(Debug, Clone, Default)]
pub struct PageLayout {
    pub page_num: usize,
    pub containers: Vec<TextContainer>,
}

impl PageLayout {
    /// Lines of the page paired with their 1-based logical index.
    pub fn numbered_lines(&self) -> impl Iterator<Item = (usize, &TextLine)> {
        self.containers
            .iter()
            .flat_map(|c| c.lines.iter())
            .enumerate()
            .map(|(i, line)| (i + 1, line))
    }
}

/// A (page, line) pair cited in a chat response.
///
/// Serializes as a two-element JSON array `[page, line]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineRef {
    pub page: u32,
    pub line: u32,
}

impl Serialize for LineRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.page, self.line).serialize(serializer)
    }
}

/// A document name plus the lines it cites, in citation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub document_name: String,
    pub references: Vec<LineRef>,
}

impl Citation {
    /// Distinct cited pages, ascending.
    pub fn pages(&self) -> Vec<u32> {
        let mut pages: Vec<u32> = self.references.iter().map(|r| r.page).collect();
        pages.sort_unstable();
        pages.dedup();
        pages
    }

    /// Cited lines on `page`, in citation order, duplicates kept.
    pub fn lines_on(&self, page: u32) -> impl Iterator<Item = u32> + '_ {
        self.references
            .iter()
            .filter(move |r| r.page == page)
            .map(|r| r.line)
    }
}

/// Highlight color with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const YELLOW: Rgb = Rgb { r: 1.0, g: 1.0, b: 0.0 };

    pub fn components(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Rgb::YELLOW
    }
}

impl FromStr for Rgb {
    type Err = String;

    /// Parses `"r,g,b"` with each component a float in `[0, 1]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let [r, g, b] = parts.as_slice() else {
            return Err(format!("expected three comma-separated components, got {s:?}"));
        };
        let parse = |v: &str| -> Result<f32, String> {
            let c: f32 = v.parse().map_err(|_| format!("invalid color component {v:?}"))?;
            if !(0.0..=1.0).contains(&c) {
                return Err(format!("color component {c} out of range 0..=1"));
            }
            Ok(c)
        };
        Ok(Rgb { r: parse(r)?, g: parse(g)?, b: parse(b)? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_new_normalises_corners() {
        let b = BoundingBox::new(10.0, 20.0, 5.0, 2.0);
        assert_eq!(b, BoundingBox { x0: 5.0, y0: 2.0, x1: 10.0, y1: 20.0 });
    }

    #[test]
    fn line_ref_serializes_as_pair() {
        let json = serde_json::to_string(&vec![LineRef { page: 1, line: 5 }]).unwrap();
        assert_eq!(json, "[[1,5]]");
    }

    #[test]
    fn citation_pages_are_distinct_and_sorted() {
        let c = Citation {
            document_name: "doc.pdf".into(),
            references: vec![
                LineRef { page: 2, line: 1 },
                LineRef { page: 1, line: 4 },
                LineRef { page: 2, line: 3 },
            ],
        };
        assert_eq!(c.pages(), vec![1, 2]);
        assert_eq!(c.lines_on(2).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn rgb_parses_components() {
        let c: Rgb = "0.5, 1,0".parse().unwrap();
        assert_eq!(c, Rgb { r: 0.5, g: 1.0, b: 0.0 });
        assert!("1,1".parse::<Rgb>().is_err());
        assert!("1,2,0".parse::<Rgb>().is_err());
        assert!("a,b,c".parse::<Rgb>().is_err());
    }
}
