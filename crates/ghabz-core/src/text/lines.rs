//! Reading-order reconstruction from positioned words.

use std::cmp::Ordering;

use crate::models::config::LayoutConfig;
use crate::models::geometry::BBox;
use crate::pdf::Word;

/// Words sharing a vertical band, ordered left to right.
#[derive(Debug, Clone)]
pub struct Line {
    /// `top` of the word that opened the line.
    pub top: f64,
    pub words: Vec<Word>,
}

impl Line {
    /// Bounding box of all words in the line.
    pub fn bbox(&self) -> Option<BBox> {
        BBox::union_all(self.words.iter().map(Word::bbox))
    }

    /// Join the words, inserting a space where the gap exceeds `word_gap`.
    pub fn text(&self, word_gap: f64) -> String {
        let mut out = String::new();
        let mut prev: Option<&Word> = None;

        for word in &self.words {
            if let Some(p) = prev {
                if word.x0 - p.x1 > word_gap {
                    out.push(' ');
                }
            }
            out.push_str(&word.text);
            prev = Some(word);
        }

        out
    }
}

/// Rebuilds lines of text from unordered word tokens.
#[derive(Debug, Clone)]
pub struct LineReconstructor {
    line_tolerance: f64,
    word_gap: f64,
}

impl LineReconstructor {
    pub fn new(layout: &LayoutConfig) -> Self {
        Self {
            line_tolerance: layout.line_tolerance,
            word_gap: layout.word_gap,
        }
    }

    /// Group words into lines, top to bottom.
    ///
    /// A word joins the current line while its `top` is within
    /// `line_tolerance` of the line's first word.
    pub fn group_lines(&self, words: &[Word]) -> Vec<Line> {
        let mut sorted: Vec<&Word> = words.iter().collect();
        sorted.sort_by(|a, b| reading_order(a, b));

        let mut lines: Vec<Line> = Vec::new();
        for word in sorted {
            match lines.last_mut() {
                Some(line) if (word.top - line.top).abs() <= self.line_tolerance => {
                    line.words.push(word.clone());
                }
                _ => lines.push(Line {
                    top: word.top,
                    words: vec![word.clone()],
                }),
            }
        }

        for line in &mut lines {
            line.words.sort_by(|a, b| {
                a.x0.total_cmp(&b.x0)
                    .then_with(|| a.top.total_cmp(&b.top))
                    .then_with(|| a.text.cmp(&b.text))
            });
        }

        lines
    }

    /// Rebuild the text of a set of words, lines joined by `\n`.
    pub fn reconstruct(&self, words: &[Word]) -> String {
        self.group_lines(words)
            .iter()
            .map(|line| line.text(self.word_gap))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn reading_order(a: &Word, b: &Word) -> Ordering {
    a.top
        .total_cmp(&b.top)
        .then_with(|| a.x0.total_cmp(&b.x0))
        .then_with(|| a.text.cmp(&b.text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn word(text: &str, x0: f64, x1: f64, top: f64) -> Word {
        Word::new(text, x0, top, x1, top + 10.0)
    }

    fn reconstructor() -> LineReconstructor {
        LineReconstructor::new(&LayoutConfig::default())
    }

    #[test]
    fn test_no_words() {
        assert_eq!(reconstructor().reconstruct(&[]), "");
        assert!(reconstructor().group_lines(&[]).is_empty());
    }

    #[test]
    fn test_space_inserted_for_gap() {
        let words = vec![word("A", 0.0, 10.0, 0.0), word("B", 50.0, 60.0, 0.0)];
        assert_eq!(reconstructor().reconstruct(&words), "A B");
    }

    #[test]
    fn test_adjacent_words_concatenate() {
        let words = vec![word("12", 0.0, 10.0, 0.0), word("00", 11.0, 20.0, 1.0)];
        assert_eq!(reconstructor().reconstruct(&words), "1200");
    }

    #[test]
    fn test_two_bands_independent_of_input_order() {
        let words = vec![
            word("C", 0.0, 10.0, 20.0),
            word("B", 50.0, 60.0, 0.0),
            word("A", 0.0, 10.0, 0.0),
        ];
        assert_eq!(reconstructor().reconstruct(&words), "A B\nC");

        let mut reversed = words.clone();
        reversed.reverse();
        assert_eq!(reconstructor().reconstruct(&reversed), "A B\nC");
    }

    #[test]
    fn test_line_uses_first_word_as_reference() {
        // 0 -> 4 stays on the line, 8 is more than 5 from the reference 0.
        let words = vec![
            word("a", 0.0, 5.0, 0.0),
            word("b", 20.0, 25.0, 4.0),
            word("c", 40.0, 45.0, 8.0),
        ];
        let lines = reconstructor().group_lines(&words);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text(2.0), "a b");
        assert_eq!(lines[1].text(2.0), "c");
    }

    #[test]
    fn test_words_in_line_ordered_by_x() {
        // Lower word on the left still comes first within its band.
        let words = vec![word("right", 100.0, 130.0, 0.0), word("left", 0.0, 20.0, 2.0)];
        assert_eq!(reconstructor().reconstruct(&words), "left right");
    }

    #[test]
    fn test_line_bbox() {
        let lines = reconstructor().group_lines(&[
            word("a", 0.0, 10.0, 0.0),
            word("b", 50.0, 60.0, 2.0),
        ]);
        assert_eq!(lines[0].bbox(), Some(BBox::new(0.0, 0.0, 60.0, 12.0)));
    }
}
