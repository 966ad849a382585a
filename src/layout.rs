use crate::types::{BoundingBox, PageChars, PageLayout, PdfChar, TextContainer, TextLine, Word};

/// Group a page's characters into words, lines, and text containers.
///
/// Lines come out in reading order: top to bottom, and for two-column
/// pages the whole left column before the right one.
pub fn group_page(page: &PageChars) -> PageLayout {
    if page.chars.is_empty() {
        return PageLayout { page_num: page.page_num, containers: Vec::new() };
    }

    let avg_char_width = compute_avg_char_width(&page.chars);
    let dominant_font_size = compute_dominant_font_size(&page.chars);

    let words = group_chars_into_words(&page.chars, avg_char_width, dominant_font_size);
    let rows = group_words_into_rows(words);
    let rows = split_columns(rows, page.width);
    PageLayout {
        page_num: page.page_num,
        containers: group_rows_into_containers(rows),
    }
}

fn compute_avg_char_width(chars: &[PdfChar]) -> f32 {
    let widths: Vec<f32> = chars.iter().filter(|c| c.width > 0.0).map(|c| c.width).collect();
    if widths.is_empty() {
        return 5.0;
    }
    widths.iter().sum::<f32>() / widths.len() as f32
}

fn compute_dominant_font_size(chars: &[PdfChar]) -> f32 {
    let mut size_counts: Vec<(i32, usize)> = Vec::new();
    for ch in chars {
        let key = (ch.font_size * 10.0) as i32;
        if let Some(entry) = size_counts.iter_mut().find(|(k, _)| *k == key) {
            entry.1 += 1;
        } else {
            size_counts.push((key, 1));
        }
    }
    size_counts
        .iter()
        .max_by_key(|(_, count)| *count)
        .map(|(key, _)| *key as f32 / 10.0)
        .unwrap_or(10.0)
}

#[derive(Default)]
struct WordAccum {
    text: String,
    x: f32,
    y: f32,
    max_x: f32,
    max_y: f32,
    font_size: f32,
    prev_right: f32,
}

impl WordAccum {
    fn start_char(&mut self, ch: &PdfChar) {
        self.x = ch.x;
        self.y = ch.y;
        self.max_x = ch.x + ch.width;
        self.max_y = ch.y + ch.height;
        self.font_size = ch.font_size;
    }

    fn extend_char(&mut self, ch: &PdfChar) {
        self.y = self.y.min(ch.y);
        self.max_x = self.max_x.max(ch.x + ch.width);
        self.max_y = self.max_y.max(ch.y + ch.height);
    }

    fn flush(&mut self, words: &mut Vec<Word>) {
        if self.text.is_empty() {
            return;
        }
        words.push(Word {
            text: std::mem::take(&mut self.text),
            x: self.x,
            y: self.y,
            width: self.max_x - self.x,
            height: self.max_y - self.y,
            font_size: self.font_size,
        });
    }
}

fn group_chars_into_words(
    chars: &[PdfChar],
    avg_char_width: f32,
    dominant_font_size: f32,
) -> Vec<Word> {
    let mut words = Vec::new();
    let gap_threshold = avg_char_width * 0.3;
    let mut acc = WordAccum::default();

    for (i, ch) in chars.iter().enumerate() {
        if ch.ch.is_whitespace() {
            acc.flush(&mut words);
            acc.prev_right = ch.x + ch.width;
            continue;
        }

        let is_break = i == 0
            || (ch.x - acc.prev_right) > gap_threshold
            || (ch.x + ch.width) < acc.prev_right - gap_threshold
            || (ch.y - acc.y).abs() > dominant_font_size * 0.5;
        if is_break {
            acc.flush(&mut words);
        }
        if acc.text.is_empty() {
            acc.start_char(ch);
        } else {
            acc.extend_char(ch);
        }
        acc.text.push(ch.ch);
        acc.prev_right = ch.x + ch.width;
    }
    acc.flush(&mut words);
    words
}

/// Words sharing a baseline, before column splitting.
struct Row {
    words: Vec<Word>,
    y: f32,
    font_size: f32,
}

impl Row {
    fn bbox(&self) -> BoundingBox {
        self.words
            .iter()
            .map(Word::bbox)
            .reduce(|acc, b| acc.union(&b))
            .unwrap_or(BoundingBox::new(0.0, self.y, 0.0, self.y))
    }

    fn into_line(self) -> TextLine {
        let bbox = self.bbox();
        let text = self
            .words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        TextLine { text, bbox, font_size: self.font_size }
    }
}

fn group_words_into_rows(words: Vec<Word>) -> Vec<Row> {
    let mut rows: Vec<Row> = Vec::new();

    for word in words {
        let merged = rows
            .iter_mut()
            .rev()
            .take(5)
            .find(|row| (word.y - row.y).abs() < word.font_size.max(row.font_size) * 0.5);

        match merged {
            Some(row) => {
                row.font_size = row.font_size.max(word.font_size);
                row.words.push(word);
            }
            None => rows.push(Row { y: word.y, font_size: word.font_size, words: vec![word] }),
        }
    }

    for row in &mut rows {
        row.words.sort_by(|a, b| a.x.total_cmp(&b.x));
    }
    // Top to bottom is high y to low y in PDF space.
    rows.sort_by(|a, b| b.y.total_cmp(&a.y));
    rows
}

/// Detect a two-column layout and reorder rows into reading order.
///
/// Rows straddling the column gap are split at the boundary; the left
/// column's rows come first, then the right column's.
fn split_columns(rows: Vec<Row>, page_width: f32) -> Vec<Row> {
    let Some(boundary) = detect_column_boundary(&rows, page_width) else {
        return rows;
    };

    let mut left_rows = Vec::new();
    let mut right_rows = Vec::new();

    for row in rows {
        let (left, right): (Vec<Word>, Vec<Word>) = row
            .words
            .into_iter()
            .partition(|w| w.x + w.width / 2.0 < boundary);
        if !left.is_empty() {
            left_rows.push(Row { words: left, y: row.y, font_size: row.font_size });
        }
        if !right.is_empty() {
            right_rows.push(Row { words: right, y: row.y, font_size: row.font_size });
        }
    }

    left_rows.extend(right_rows);
    left_rows
}

/// Find the x-coordinate of a column gap, if the page is two-column.
///
/// Looks for a vertical strip in the middle 30-70% of the page that is
/// (nearly) free of words while both sides carry text.
fn detect_column_boundary(rows: &[Row], page_width: f32) -> Option<f32> {
    if page_width <= 0.0 || rows.len() < 4 {
        return None;
    }

    // 200 buckets is ~3pt each on letter paper, fine enough for ~10pt gutters.
    let n_buckets = 200;
    let bucket_width = page_width / n_buckets as f32;
    let mut coverage = vec![0u32; n_buckets];

    for word in rows.iter().flat_map(|r| r.words.iter()) {
        let start = ((word.x.max(0.0) / page_width) * n_buckets as f32) as usize;
        let end = (((word.x + word.width).max(0.0) / page_width) * n_buckets as f32) as usize;
        let (start, end) = (start.min(n_buckets - 1), end.min(n_buckets - 1));
        for bucket in &mut coverage[start..=end.max(start)] {
            *bucket += 1;
        }
    }

    let boundary = find_gap_in_coverage(&coverage, bucket_width, rows.len())?;
    let has_left = coverage[..(boundary / bucket_width) as usize].iter().any(|&c| c > 0);
    let has_right = coverage[(boundary / bucket_width) as usize..].iter().any(|&c| c > 0);
    (has_left && has_right).then_some(boundary)
}

fn find_gap_in_coverage(coverage: &[u32], bucket_width: f32, num_rows: usize) -> Option<f32> {
    let n_buckets = coverage.len();
    let search_start = n_buckets * 30 / 100;
    let search_end = n_buckets * 70 / 100;
    let threshold = (num_rows as u32) / 10;

    let mut best: Option<(usize, usize)> = None;
    let mut gap_start = None;

    for (i, &val) in coverage.iter().enumerate().take(search_end).skip(search_start) {
        if val > threshold {
            gap_start = None;
            continue;
        }
        let start = *gap_start.get_or_insert(i);
        let len = i - start + 1;
        if best.is_none_or(|(_, best_len)| len > best_len) {
            best = Some((start, len));
        }
    }

    let (start, len) = best?;
    Some((start as f32 + len as f32 / 2.0) * bucket_width)
}

fn group_rows_into_containers(rows: Vec<Row>) -> Vec<TextContainer> {
    let mut groups: Vec<Vec<TextLine>> = Vec::new();

    for row in rows {
        let line = row.into_line();
        let continues = groups.last().and_then(|g| g.last()).is_some_and(|prev| {
            let gap = (prev.bbox.y0 - line.bbox.y0).abs();
            let x_overlap = line.bbox.x0 < prev.bbox.x1 && line.bbox.x1 > prev.bbox.x0;
            gap < line.font_size * 1.5 && x_overlap
        });

        match groups.last_mut() {
            Some(group) if continues => group.push(line),
            _ => groups.push(vec![line]),
        }
    }

    groups.into_iter().map(TextContainer::from_lines).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Lay out `text` as fixed-width glyphs starting at (x, y).
    fn glyphs(text: &str, x: f32, y: f32) -> Vec<PdfChar> {
        text.chars()
            .enumerate()
            .map(|(i, ch)| PdfChar {
                ch,
                x: x + i as f32 * 6.0,
                y,
                width: 6.0,
                height: 10.0,
                font_size: 10.0,
            })
            .collect()
    }

    fn page(chars: Vec<PdfChar>) -> PageChars {
        PageChars { page_num: 1, width: 612.0, chars }
    }

    fn all_lines(layout: &PageLayout) -> Vec<String> {
        layout.numbered_lines().map(|(_, l)| l.text.clone()).collect()
    }

    #[test]
    fn empty_page_has_no_containers() {
        let layout = group_page(&page(Vec::new()));
        assert!(layout.containers.is_empty());
    }

    #[test]
    fn lines_ordered_top_to_bottom() {
        let mut chars = glyphs("second line", 72.0, 688.0);
        chars.extend(glyphs("first line", 72.0, 700.0));
        let layout = group_page(&page(chars));
        assert_eq!(all_lines(&layout), vec!["first line", "second line"]);
    }

    #[test]
    fn line_bbox_spans_its_words() {
        let layout = group_page(&page(glyphs("hello world", 100.0, 500.0)));
        let (_, line) = layout.numbered_lines().next().unwrap();
        assert_eq!(line.bbox.x0, 100.0);
        assert_eq!(line.bbox.y0, 500.0);
        assert_eq!(line.bbox.x1, 100.0 + 11.0 * 6.0);
        assert_eq!(line.bbox.y1, 510.0);
    }

    #[test]
    fn distant_paragraphs_become_separate_containers() {
        let mut chars = glyphs("para one a", 72.0, 700.0);
        chars.extend(glyphs("para one b", 72.0, 688.0));
        chars.extend(glyphs("para two", 72.0, 500.0));
        let layout = group_page(&page(chars));
        assert_eq!(layout.containers.len(), 2);
        assert_eq!(layout.containers[0].lines.len(), 2);
        assert_eq!(layout.containers[1].lines[0].text, "para two");
    }

    #[test]
    fn two_columns_read_left_then_right() {
        let mut chars = Vec::new();
        for (i, y) in [700.0, 688.0, 676.0, 664.0].into_iter().enumerate() {
            chars.extend(glyphs(&format!("left {i}"), 50.0, y));
            chars.extend(glyphs(&format!("right {i}"), 400.0, y));
        }
        let layout = group_page(&page(chars));
        assert_eq!(
            all_lines(&layout),
            vec!["left 0", "left 1", "left 2", "left 3", "right 0", "right 1", "right 2", "right 3"]
        );
    }
}
