//! Batched HIT launching.
//!
//! Takes a flat list of work items, slices it into fixed-size batches, and
//! creates one HIT per batch with the rendered question template. Launches
//! are sequential; the first failure aborts with no cleanup of HITs that
//! were already created.

use serde_json::Value;

use crate::config::MarketplaceConfig;
use crate::error::LaunchError;
use crate::marketplace::{HitSpec, MarketplaceApi, QualificationRequirement};
use crate::template::{html_question, TaskTemplates};

/// Default assignment duration in seconds (15 minutes).
pub const DEFAULT_DURATION_SECS: u64 = 900;
/// Default HIT lifetime in seconds (7 days).
pub const DEFAULT_LIFETIME_SECS: u64 = 604_800;
/// Default approved-HIT qualification threshold.
pub const DEFAULT_HITS_APPROVED: u32 = 10_000;
/// Default approval-percentage qualification threshold.
pub const DEFAULT_PERCENT_APPROVED: u32 = 95;

/// Options for launching a batch of HITs from a task template.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Template name, relative to the templates directory.
    pub template: String,
    pub title: String,
    pub description: String,
    pub keywords: String,
    /// Reward per assignment as a decimal string (e.g. "1.00").
    pub reward: String,
    /// Number of work items per HIT.
    pub tasks_per_hit: usize,
    pub max_assignments: u32,
    pub frame_height: u32,
    pub duration_secs: u64,
    pub lifetime_secs: u64,
    pub country: String,
    pub hits_approved: u32,
    pub percent_approved: u32,
}

impl LaunchOptions {
    /// Baseline options for a custom template.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            title: String::new(),
            description: String::new(),
            keywords: String::new(),
            reward: "1.00".to_string(),
            tasks_per_hit: 10,
            max_assignments: 1,
            frame_height: 9000,
            duration_secs: DEFAULT_DURATION_SECS,
            lifetime_secs: DEFAULT_LIFETIME_SECS,
            country: "US".to_string(),
            hits_approved: DEFAULT_HITS_APPROVED,
            percent_approved: DEFAULT_PERCENT_APPROVED,
        }
    }

    /// Preset: caption a batch of images.
    pub fn caption() -> Self {
        Self {
            title: "Caption some pictures".to_string(),
            description: "Write captions about the contents of images.".to_string(),
            keywords: "image, caption, text".to_string(),
            tasks_per_hit: 10,
            ..Self::new("tasks/write_caption.html")
        }
    }

    /// Preset: verify answers to questions about images.
    pub fn verify_question_answer() -> Self {
        Self {
            title: "Verify the answer to a question about a picture".to_string(),
            description: "Verify whether an answer to a question about a picture is correct."
                .to_string(),
            keywords: "image, text, picture, answer, question, relationship".to_string(),
            tasks_per_hit: 50,
            ..Self::new("tasks/verify_question_answer.html")
        }
    }

    /// Preset: verify bounding boxes drawn around objects.
    pub fn verify_bbox() -> Self {
        Self {
            title: "Verify objects in pictures".to_string(),
            description: "Verify whether objects are correctly identified in pictures."
                .to_string(),
            keywords: "image, text, picture, object, bounding box".to_string(),
            tasks_per_hit: 30,
            ..Self::new("tasks/verify_bbox.html")
        }
    }

    /// Preset: verify relationships between objects in images.
    pub fn verify_relationship() -> Self {
        Self {
            title: "Verify relationships between objects in pictures".to_string(),
            description: "Verify whether the relationships are correctly identified in pictures."
                .to_string(),
            keywords: "image, text, picture, object, bounding box, relationship".to_string(),
            tasks_per_hit: 30,
            ..Self::new("tasks/verify_relationship.html")
        }
    }

    /// Look up a preset by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "caption" => Some(Self::caption()),
            "verify-question-answer" => Some(Self::verify_question_answer()),
            "verify-bbox" => Some(Self::verify_bbox()),
            "verify-relationship" => Some(Self::verify_relationship()),
            _ => None,
        }
    }

    /// Set the reward per assignment.
    pub fn with_reward(mut self, reward: impl Into<String>) -> Self {
        self.reward = reward.into();
        self
    }

    /// Set the batch size.
    pub fn with_tasks_per_hit(mut self, tasks_per_hit: usize) -> Self {
        self.tasks_per_hit = tasks_per_hit;
        self
    }

    /// Set the number of workers per HIT.
    pub fn with_max_assignments(mut self, max_assignments: u32) -> Self {
        self.max_assignments = max_assignments;
        self
    }
}

/// Partition `items` into contiguous slices of at most `batch_size`.
///
/// Produces `ceil(items.len() / batch_size)` slices; the last slice may be
/// smaller. Concatenating the slices reconstructs `items` unchanged.
pub fn batch_slices<T>(items: &[T], batch_size: usize) -> Vec<&[T]> {
    items.chunks(batch_size).collect()
}

/// Launches HITs against the marketplace.
pub struct HitLauncher<'a> {
    api: &'a dyn MarketplaceApi,
    templates: &'a TaskTemplates,
    config: &'a MarketplaceConfig,
}

impl<'a> HitLauncher<'a> {
    pub fn new(
        api: &'a dyn MarketplaceApi,
        templates: &'a TaskTemplates,
        config: &'a MarketplaceConfig,
    ) -> Self {
        Self {
            api,
            templates,
            config,
        }
    }

    /// Launch HITs for `items`, one per batch of `opts.tasks_per_hit`.
    ///
    /// Returns the created HIT IDs in batch order. The first failed
    /// creation aborts the launch; HITs created before the failure stay
    /// live on the marketplace.
    pub async fn launch(
        &self,
        items: &[Value],
        opts: &LaunchOptions,
    ) -> Result<Vec<String>, LaunchError> {
        if opts.tasks_per_hit == 0 {
            return Err(LaunchError::ZeroBatchSize);
        }

        let qualifications = self.qualifications(opts);
        let mut hit_ids = Vec::new();
        for batch in batch_slices(items, opts.tasks_per_hit) {
            let input = Value::Array(batch.to_vec());
            let html = self.templates.render_question(&opts.template, &input)?;
            let spec = HitSpec {
                title: opts.title.clone(),
                description: opts.description.clone(),
                keywords: opts.keywords.clone(),
                reward: opts.reward.clone(),
                max_assignments: opts.max_assignments,
                lifetime_secs: opts.lifetime_secs,
                assignment_duration_secs: opts.duration_secs,
                qualification_requirements: qualifications.clone(),
                question: html_question(&html, opts.frame_height),
            };
            let hit = self.api.create_hit(&spec).await?;
            hit_ids.push(hit.hit_id);
        }

        tracing::info!(
            hits = hit_ids.len(),
            items = items.len(),
            template = %opts.template,
            "Launched HIT batch"
        );
        Ok(hit_ids)
    }

    /// Qualification requirements for a launch.
    ///
    /// Sandbox workers have no history, so the history-based thresholds
    /// drop to zero there.
    fn qualifications(&self, opts: &LaunchOptions) -> Vec<QualificationRequirement> {
        let (hits_approved, percent_approved) = if self.config.sandbox {
            (0, 0)
        } else {
            (opts.hits_approved, opts.percent_approved)
        };
        vec![
            QualificationRequirement::approved_hits_at_least(hits_approved),
            QualificationRequirement::locale_equals(opts.country.clone()),
            QualificationRequirement::approval_rate_at_least(percent_approved),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marketplace::testing::MockMarketplace;

    fn test_templates(dir: &std::path::Path) -> TaskTemplates {
        let tasks = dir.join("tasks");
        std::fs::create_dir_all(&tasks).expect("mkdir");
        std::fs::write(tasks.join("echo.html"), "<div>{{ input }}</div>").expect("write");
        TaskTemplates::from_dir(dir).expect("load templates")
    }

    #[tokio::test]
    async fn test_launch_issues_one_create_per_batch() {
        let dir = tempfile::tempdir().expect("tempdir");
        let templates = test_templates(dir.path());
        let mock = MockMarketplace::new();
        let config = crate::config::MarketplaceConfig::production("tok");
        let launcher = HitLauncher::new(&mock, &templates, &config);

        let items: Vec<Value> = (1..=25).map(|i| serde_json::json!({"n": i})).collect();
        let opts = LaunchOptions::new("tasks/echo.html").with_tasks_per_hit(10);

        let hit_ids = launcher.launch(&items, &opts).await.expect("launch");
        assert_eq!(hit_ids.len(), 3);
        assert_eq!(
            hit_ids,
            vec!["HIT1".to_string(), "HIT2".to_string(), "HIT3".to_string()]
        );

        let created = mock.created.lock().unwrap();
        assert_eq!(created.len(), 3);
        // The last batch carries the 5-item remainder.
        assert!(created[0].question.contains("HTMLQuestion"));
    }

    #[tokio::test]
    async fn test_launch_zero_batch_size_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let templates = test_templates(dir.path());
        let mock = MockMarketplace::new();
        let config = crate::config::MarketplaceConfig::production("tok");
        let launcher = HitLauncher::new(&mock, &templates, &config);

        let opts = LaunchOptions::new("tasks/echo.html").with_tasks_per_hit(0);
        let result = launcher.launch(&[serde_json::json!(1)], &opts).await;
        assert!(matches!(result, Err(LaunchError::ZeroBatchSize)));
    }

    #[tokio::test]
    async fn test_sandbox_relaxes_qualification_thresholds() {
        let dir = tempfile::tempdir().expect("tempdir");
        let templates = test_templates(dir.path());
        let mock = MockMarketplace::new();
        let config = crate::config::MarketplaceConfig::sandbox("tok");
        let launcher = HitLauncher::new(&mock, &templates, &config);

        let opts = LaunchOptions::new("tasks/echo.html");
        launcher
            .launch(&[serde_json::json!(1)], &opts)
            .await
            .expect("launch");

        let created = mock.created.lock().unwrap();
        let quals = &created[0].qualification_requirements;
        assert_eq!(quals[0].integer_values, vec![0]);
        assert_eq!(quals[2].integer_values, vec![0]);
        assert_eq!(quals[1].locale_values[0].country, "US");
    }

    #[test]
    fn test_batch_slices_exact_division() {
        let items: Vec<u32> = (1..=20).collect();
        let slices = batch_slices(&items, 10);
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].len(), 10);
        assert_eq!(slices[1].len(), 10);
    }

    #[test]
    fn test_batch_slices_remainder() {
        // 25 items at batch size 10 -> [1..10], [11..20], [21..25].
        let items: Vec<u32> = (1..=25).collect();
        let slices = batch_slices(&items, 10);
        assert_eq!(slices.len(), 3);
        assert_eq!(slices[0], (1..=10).collect::<Vec<u32>>().as_slice());
        assert_eq!(slices[1], (11..=20).collect::<Vec<u32>>().as_slice());
        assert_eq!(slices[2], (21..=25).collect::<Vec<u32>>().as_slice());
    }

    #[test]
    fn test_batch_slices_concatenation_reconstructs_input() {
        for (n, b) in [(0usize, 3usize), (1, 1), (7, 3), (9, 4), (100, 7)] {
            let items: Vec<usize> = (0..n).collect();
            let slices = batch_slices(&items, b);
            assert_eq!(slices.len(), n.div_ceil(b));
            let rebuilt: Vec<usize> = slices.concat();
            assert_eq!(rebuilt, items);
        }
    }

    #[test]
    fn test_preset_lookup() {
        let opts = LaunchOptions::preset("caption").expect("caption preset exists");
        assert_eq!(opts.template, "tasks/write_caption.html");
        assert_eq!(opts.tasks_per_hit, 10);
        assert!(LaunchOptions::preset("unknown").is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let opts = LaunchOptions::verify_bbox()
            .with_reward("0.50")
            .with_tasks_per_hit(5)
            .with_max_assignments(3);
        assert_eq!(opts.reward, "0.50");
        assert_eq!(opts.tasks_per_hit, 5);
        assert_eq!(opts.max_assignments, 3);
        assert_eq!(opts.duration_secs, DEFAULT_DURATION_SECS);
    }
}
