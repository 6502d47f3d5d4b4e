//! 文本分割器
//!
//! 把一页的段落序列重新打包成不超过 `max_chars` 的合成缓冲区：
//! 整段优先，放不下时退化到句子，句子也放不下时退化到单词。

use std::collections::VecDeque;

/// OpenAI 语音合成接口的单次输入上限
pub const DEFAULT_MAX_CHARS: usize = 4096;

/// 段落之间的分隔符
const PARAGRAPH_SEPARATOR: &str = "\n";

/// 句子、单词之间的分隔符
const WORD_SEPARATOR: &str = " ";

/// 检查是否为句末标点
#[inline]
fn is_sentence_terminal(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?')
}

/// 按换行拆分页面文本，丢弃空段落
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// 按句末标点拆分文本
///
/// `.` `!` `?` 后跟空白才算句末；连续两个以上的句点（省略号）不断句。
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut period_run = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        if ch == '.' {
            period_run += 1;
        }

        if is_sentence_terminal(ch) {
            let followed_by_space = chars.peek().is_some_and(|(_, next)| next.is_whitespace());
            let ellipsis = ch == '.' && period_run > 1;

            if followed_by_space && !ellipsis {
                let end = idx + ch.len_utf8();
                let sentence = text[start..end].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                start = end;
            }
        }

        if ch != '.' {
            period_run = 0;
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }

    sentences
}

/// 缓冲区累加器
struct BufferPacker {
    max_chars: usize,
    buffers: Vec<String>,
    current: String,
    /// current 的字符数（避免反复 chars().count()）
    current_chars: usize,
}

impl BufferPacker {
    fn new(max_chars: usize) -> Self {
        Self {
            max_chars,
            buffers: Vec::new(),
            current: String::new(),
            current_chars: 0,
        }
    }

    fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// 尝试追加文本，放得下则追加并返回 true
    fn try_append(&mut self, text: &str, separator: &str) -> bool {
        let text_chars = text.chars().count();
        let added = if self.current.is_empty() {
            text_chars
        } else {
            separator.chars().count() + text_chars
        };

        if self.current_chars + added > self.max_chars {
            return false;
        }

        if !self.current.is_empty() {
            self.current.push_str(separator);
        }
        self.current.push_str(text);
        self.current_chars += added;
        true
    }

    fn flush(&mut self) {
        let buffer = std::mem::take(&mut self.current);
        self.current_chars = 0;
        let trimmed = buffer.trim();
        if !trimmed.is_empty() {
            self.buffers.push(trimmed.to_string());
        }
    }

    /// 逐词填充当前缓冲区，返回放不下的部分
    ///
    /// 只在空缓冲区上调用。单个词超过上限时按上限硬切，保证每次至少前进一个字符。
    fn fill_words(&mut self, sentence: &str) -> String {
        let words: Vec<&str> = sentence.split_whitespace().collect();

        for (i, word) in words.iter().enumerate() {
            if self.try_append(word, WORD_SEPARATOR) {
                continue;
            }

            let mut rest: Vec<String> = Vec::with_capacity(words.len() - i);
            if self.is_empty() {
                let split_at = word
                    .char_indices()
                    .nth(self.max_chars)
                    .map(|(idx, _)| idx)
                    .unwrap_or(word.len());
                let (head, tail) = word.split_at(split_at);
                self.try_append(head, WORD_SEPARATOR);
                if !tail.is_empty() {
                    rest.push(tail.to_string());
                }
            } else {
                rest.push(word.to_string());
            }
            rest.extend(words[i + 1..].iter().map(|w| w.to_string()));
            return rest.join(WORD_SEPARATOR);
        }

        String::new()
    }

    fn finish(mut self) -> Vec<String> {
        self.flush();
        if self.buffers.is_empty() {
            // 空输入：返回单个空缓冲区，调用方视为无内容可合成
            return vec![String::new()];
        }
        self.buffers
    }
}

/// 将段落序列分割为不超过 `max_chars` 个字符的缓冲区
///
/// 分割策略：
/// 1. 整段贪心追加（段落间用换行连接）
/// 2. 整段放不下时按句子追加，句子放不进非空缓冲区则先刷出
/// 3. 单句超过上限时逐词填充，剩余部分放回工作队列队首
///
/// 输出保持阅读顺序，除空输入外不会产生空缓冲区。
pub fn segment<S: AsRef<str>>(paragraphs: &[S], max_chars: usize) -> Vec<String> {
    let mut packer = BufferPacker::new(max_chars.max(1));
    let mut work: VecDeque<String> = paragraphs
        .iter()
        .map(|p| p.as_ref().trim())
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();

    while let Some(paragraph) = work.pop_front() {
        if packer.try_append(&paragraph, PARAGRAPH_SEPARATOR) {
            continue;
        }

        let sentences = split_sentences(&paragraph);
        let mut index = 0;

        while index < sentences.len() {
            let separator = if index == 0 {
                PARAGRAPH_SEPARATOR
            } else {
                WORD_SEPARATOR
            };

            if packer.try_append(sentences[index], separator) {
                index += 1;
                continue;
            }

            if !packer.is_empty() {
                packer.flush();
                continue;
            }

            let remainder = packer.fill_words(sentences[index]);
            if remainder.is_empty() {
                index += 1;
                continue;
            }

            packer.flush();
            let mut rest = remainder;
            for sentence in &sentences[index + 1..] {
                rest.push_str(WORD_SEPARATOR);
                rest.push_str(sentence);
            }
            work.push_front(rest);
            break;
        }
    }

    packer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip_whitespace(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    /// 简单的线性同余生成器，避免引入随机数依赖
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self) -> u64 {
            self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            self.0 >> 33
        }

        fn below(&mut self, n: u64) -> u64 {
            self.next() % n
        }
    }

    fn random_paragraphs(rng: &mut Lcg) -> Vec<String> {
        let paragraph_count = rng.below(6) as usize;
        (0..paragraph_count)
            .map(|_| {
                let word_count = rng.below(80) as usize;
                let mut p = String::new();
                for w in 0..word_count {
                    if w > 0 {
                        p.push(' ');
                    }
                    let cap = if rng.below(20) == 0 { 60 } else { 9 };
                    let len = 1 + rng.below(cap) as usize;
                    for _ in 0..len {
                        p.push((b'a' + rng.below(26) as u8) as char);
                    }
                    match rng.below(10) {
                        0 => p.push('.'),
                        1 => p.push('?'),
                        2 => p.push_str("..."),
                        _ => {}
                    }
                }
                p
            })
            .collect()
    }

    #[test]
    fn test_long_token_scenario() {
        let long = "A".repeat(5000);
        let buffers = segment(&["Hello world.".to_string(), long], 4096);

        assert_eq!(buffers.len(), 3);
        assert_eq!(buffers[0], "Hello world.");
        assert_eq!(buffers[1], "A".repeat(4096));
        assert_eq!(buffers[2], "A".repeat(904));
    }

    #[test]
    fn test_empty_input_yields_sentinel() {
        let empty: Vec<String> = Vec::new();
        assert_eq!(segment(&empty, 10), vec![String::new()]);
        assert_eq!(segment(&["", "   "], 10), vec![String::new()]);
    }

    #[test]
    fn test_paragraphs_packed_together_when_they_fit() {
        let buffers = segment(&["One.", "Two.", "Three."], 100);
        assert_eq!(buffers, vec!["One.\nTwo.\nThree."]);
    }

    #[test]
    fn test_falls_back_to_sentences() {
        let buffers = segment(&["First sentence. Second sentence. Third one."], 33);
        assert_eq!(buffers, vec!["First sentence. Second sentence.", "Third one."]);
    }

    #[test]
    fn test_sentence_retried_in_fresh_buffer() {
        let buffers = segment(&["Short.", "A longer sentence here. Tail."], 25);
        assert_eq!(
            buffers,
            vec!["Short.", "A longer sentence here.", "Tail."]
        );
    }

    #[test]
    fn test_word_fallback_only_for_oversized_sentence() {
        let buffers = segment(&["alpha beta gamma delta epsilon"], 12);
        assert_eq!(buffers, vec!["alpha beta", "gamma delta", "epsilon"]);
        for b in &buffers {
            assert!(b.chars().count() <= 12);
        }
    }

    #[test]
    fn test_remaining_sentences_follow_word_split() {
        let buffers = segment(&["aaaa bbbb cccc dddd. Next one."], 10);
        assert_eq!(buffers, vec!["aaaa bbbb", "cccc dddd.", "Next one."]);
    }

    #[test]
    fn test_ellipsis_is_not_a_sentence_end() {
        let sentences = split_sentences("Wait... then go. Really? Yes! done");
        assert_eq!(sentences, vec!["Wait... then go.", "Really?", "Yes!", "done"]);
    }

    #[test]
    fn test_punctuation_without_space_does_not_split() {
        assert_eq!(split_sentences("v1.2 is out.Final"), vec!["v1.2 is out.Final"]);
    }

    #[test]
    fn test_split_paragraphs_discards_empty() {
        assert_eq!(split_paragraphs("a\n\n  \nb\n"), vec!["a", "b"]);
    }

    #[test]
    fn test_multibyte_characters_counted_as_chars() {
        let word = "é".repeat(10);
        let buffers = segment(&[word.as_str()], 4);
        assert_eq!(buffers, vec!["éééé", "éééé", "éé"]);
    }

    #[test]
    fn test_zero_limit_still_terminates() {
        let buffers = segment(&["ab c"], 0);
        assert_eq!(buffers, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_random_inputs_round_trip_and_respect_bound() {
        let mut rng = Lcg(42);
        for round in 0..300 {
            let paragraphs = random_paragraphs(&mut rng);
            let max_chars = 5 + rng.below(120) as usize;
            let buffers = segment(&paragraphs, max_chars);

            let original: String = paragraphs.iter().map(|p| strip_whitespace(p)).collect();
            let rebuilt: String = buffers.iter().map(|b| strip_whitespace(b)).collect();
            assert_eq!(rebuilt, original, "round {} lost or duplicated content", round);

            for buffer in &buffers {
                assert!(buffer.chars().count() <= max_chars, "round {} exceeded bound", round);
            }

            if !original.is_empty() {
                assert!(buffers.iter().all(|b| !b.is_empty()));
            }
        }
    }
}
