use std::ops::Range;

use log::debug;

use crate::index::{LyricsLine, EMPTY_LINE_TEXT};
use crate::timestamp::{self, Seconds, TOKEN_REGEX};

#[derive(Debug, Clone, PartialEq)]
struct Token {
    span: Range<usize>,
    seconds: Seconds,
}

/// Every well-formed token on the line, left to right.
fn tokens(line: &str) -> Vec<Token> {
    TOKEN_REGEX
        .find_iter(line)
        .filter_map(|m| {
            // Matches the grammar by construction; a value that still fails to
            // decode (e.g. minutes overflow) stays in the text.
            let seconds = timestamp::decode(m.as_str()).ok()?;
            Some(Token {
                span: m.range(),
                seconds,
            })
        })
        .collect()
}

fn strip_tokens(line: &str, tokens: &[Token]) -> String {
    let mut text = String::with_capacity(line.len());
    let mut pos = 0;
    for token in tokens {
        text.push_str(&line[pos..token.span.start]);
        pos = token.span.end;
    }
    text.push_str(&line[pos..]);

    let text = text.trim();
    if text.is_empty() {
        EMPTY_LINE_TEXT.to_string()
    } else {
        text.to_string()
    }
}

/// Split timestamp-annotated text into lines with inferred time bounds.
///
/// A line without a leading token starts at the running time cursor. A line
/// without a trailing token stays open-ended until the next line carrying any
/// token, whose first token closes every open line at once. Lines after the
/// last token remain open-ended.
pub fn parse(raw: &str) -> Vec<LyricsLine> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }

    let mut lines: Vec<LyricsLine> = Vec::new();
    let mut cursor: Seconds = 0.0;
    let mut pending: Vec<usize> = Vec::new();

    for raw_line in raw.lines() {
        let raw_line = raw_line.trim();
        let tokens = tokens(raw_line);

        if let Some(first) = tokens.first() {
            if !pending.is_empty() {
                debug!(
                    "closing {} open line(s) at {}",
                    pending.len(),
                    timestamp::encode(first.seconds)
                );
                for i in pending.drain(..) {
                    let line = &mut lines[i];
                    line.end = Some(first.seconds.max(line.start));
                }
            }
        }

        let leading = tokens.first().filter(|t| t.span.start == 0);
        let trailing = tokens.last().filter(|t| t.span.end == raw_line.len());

        let start = match leading {
            Some(token) => {
                cursor = token.seconds;
                token.seconds
            }
            None => cursor,
        };

        let end = match trailing {
            Some(token) => {
                cursor = token.seconds;
                Some(token.seconds.max(start))
            }
            None => {
                pending.push(lines.len());
                None
            }
        };

        lines.push(LyricsLine {
            index: lines.len(),
            text: strip_tokens(raw_line, &tokens),
            start,
            end,
            active: false,
        });
    }

    debug!(
        "parsed {} lyric lines, {} left open-ended",
        lines.len(),
        pending.len()
    );

    lines
}
