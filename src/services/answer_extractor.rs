//! 答案提取 - 业务能力层
//!
//! 从模型的自由文本中取出 `FINAL ANSWER:` 之后的内容并归一化。
//! 纯函数，没有任何副作用，任何输入都不会失败。

/// 答案标记
pub const FINAL_ANSWER_MARKER: &str = "FINAL ANSWER:";

/// 会被从答案末尾去掉的标点
const TRAILING_PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':'];

/// 提取并归一化最终答案
///
/// 步骤：
/// 1. 定位 `FINAL ANSWER:`（区分大小写），出现多次时取最后一次
/// 2. 取标记之后到文本末尾的内容
/// 3. 去掉所有空白字符（包括中间的空白，`new york city` → `newyorkcity`）
/// 4. 反复去掉末尾的标点
/// 5. 去掉开头的 `+`（`+100` → `100`）
///
/// 结果为空时返回 `None`。
///
/// 归一化后的结果再提取一次得到的还是它自己。
pub fn extract(raw_text: &str) -> Option<String> {
    let (_, tail) = raw_text.rsplit_once(FINAL_ANSWER_MARKER)?;

    // 先去掉空白，末尾的 "42 ." 之类才能一次去干净
    let collapsed: String = tail.chars().filter(|c| !c.is_whitespace()).collect();

    let answer = collapsed
        .trim_end_matches(TRAILING_PUNCTUATION)
        .trim_start_matches('+');

    if answer.is_empty() {
        None
    } else {
        Some(answer.to_string())
    }
}
