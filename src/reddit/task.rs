//! The digest task handed to the planner.

/// One numbered line of the digest task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    RetrieveLatest,
    SummariseWithLinks,
    ListHighEngagement,
    DraftComments,
    RenderMarkdown,
}

impl Instruction {
    pub const ALL: [Instruction; 5] = [
        Instruction::RetrieveLatest,
        Instruction::SummariseWithLinks,
        Instruction::ListHighEngagement,
        Instruction::DraftComments,
        Instruction::RenderMarkdown,
    ];

    fn render(self, subreddit: &str, post_count: usize) -> String {
        match self {
            Self::RetrieveLatest => format!(
                "retrieve the latest {} posts from the r/{} subreddit",
                post_count, subreddit
            ),
            Self::SummariseWithLinks => "summarise each posts with source link".to_string(),
            Self::ListHighEngagement => "list posts with High engagement".to_string(),
            Self::DraftComments => {
                "for post with high engagement, draft a comment that are relevant to the thread"
                    .to_string()
            }
            Self::RenderMarkdown => "Turn the outputs into a Markdown format".to_string(),
        }
    }
}

/// Parameterised digest prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTemplate {
    pub post_count: usize,
    pub instructions: Vec<Instruction>,
}

impl Default for TaskTemplate {
    fn default() -> Self {
        Self::with_post_count(5)
    }
}

impl TaskTemplate {
    pub fn with_post_count(post_count: usize) -> Self {
        Self {
            post_count,
            instructions: Instruction::ALL.to_vec(),
        }
    }

    /// Numbered task for `subreddit`, which is inserted verbatim.
    pub fn render(&self, subreddit: &str) -> String {
        self.instructions
            .iter()
            .enumerate()
            .map(|(i, ins)| format!("{}. {}", i + 1, ins.render(subreddit, self.post_count)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_task_has_all_five_instructions() {
        let task = TaskTemplate::default().render("python");
        assert!(task.contains("r/python"));
        for fragment in ["retrieve", "summarise", "engagement", "draft", "Markdown"] {
            assert!(task.contains(fragment), "missing {fragment}");
        }
        assert!(task.starts_with("1. retrieve the latest 5 posts"));
        assert!(task.contains("\n5. Turn the outputs into a Markdown format"));
    }

    #[test]
    fn subreddit_is_not_sanitised() {
        let task = TaskTemplate::with_post_count(3).render("a b/../c");
        assert!(task.contains("latest 3 posts from the r/a b/../c subreddit"));
    }

    #[test]
    fn instruction_subset_is_renumbered() {
        let template = TaskTemplate {
            post_count: 2,
            instructions: vec![Instruction::RetrieveLatest, Instruction::RenderMarkdown],
        };
        assert_eq!(
            template.render("rust"),
            "1. retrieve the latest 2 posts from the r/rust subreddit\n2. Turn the outputs into a Markdown format"
        );
    }
}
