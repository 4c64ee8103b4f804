//! 默认 Prompt 模板
//!
//! 初始与变异 Prompt 共用同一条输出约定（只返回代码），保证变异产物与种子产物对 evaluate 是同一种文本格式。

/// 所有 Prompt 末尾的输出约定
pub const OUTPUT_CONTRACT: &str = "Return ONLY the code, no markdown.";

pub fn initial_prompt(description: &str) -> String {
    format!("Write a Python function for this task: {description}. {OUTPUT_CONTRACT}")
}

pub fn mutation_prompt(code: &str, feedback: &str, fitness: f64) -> String {
    let feedback = if feedback.trim().is_empty() {
        "none"
    } else {
        feedback.trim()
    };
    format!(
        "Improve this code. Current fitness: {fitness:.4} (1.0 is perfect).\n\
         Previous feedback/error: {feedback}\n\
         \n\
         Code:\n\
         {code}\n\
         \n\
         Before changing anything, form one concrete hypothesis about what limits the current fitness \
         and write it as a single `#` comment on the first line. Then apply the change that tests it.\n\
         {OUTPUT_CONTRACT}\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_prompt_embeds_description() {
        let p = initial_prompt("Sort a list of integers in ascending order");
        assert!(p.contains("Sort a list of integers"));
        assert!(p.ends_with(OUTPUT_CONTRACT));
    }

    #[test]
    fn test_mutation_prompt_embeds_parent_state() {
        let p = mutation_prompt("def f(x):\n    return x", "NameError: y", 0.25);
        assert!(p.contains("Current fitness: 0.2500"));
        assert!(p.contains("NameError: y"));
        assert!(p.contains("def f(x):\n    return x"));
        assert!(p.contains(OUTPUT_CONTRACT));
    }

    #[test]
    fn test_mutation_prompt_with_empty_feedback() {
        let p = mutation_prompt("def f(): pass", "  ", 0.0);
        assert!(p.contains("Previous feedback/error: none"));
    }
}
