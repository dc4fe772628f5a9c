use {
    crate::{
        capture::default_strategies, CaptureIssue, CaptureMethod, CaptureStrategy, Color,
        DisplayLayout, ScreenPoint, SystemLayout, VirtualScreen,
    },
    itertools::Itertools,
    std::{
        collections::{HashMap, HashSet},
        time::{Duration, Instant},
    },
    tracing::{debug, info, warn},
};

/// A strategy slower than this is skipped for the rest of the sampler's lifetime.
pub const DEFAULT_STRATEGY_BUDGET: Duration = Duration::from_millis(1500);

/// Result of sampling the neighborhood of a point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub color: Color,
    pub samples: Vec<Color>,
    pub method: Option<CaptureMethod>,
}

impl Sample {
    pub fn sentinel() -> Self {
        Self {
            color: Color::SENTINEL,
            samples: Vec::new(),
            method: None,
        }
    }

    pub fn from_samples(samples: Vec<Color>, method: CaptureMethod) -> Self {
        Self {
            color: dominant_color(&samples).unwrap_or(Color::SENTINEL),
            samples,
            method: Some(method),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.method.is_none()
    }
}

/// Anything that can report the color under a screen point.
pub trait PixelSource {
    fn sample(&mut self, point: ScreenPoint) -> Sample;

    /// Operator-facing messages produced since the last call.
    fn take_log_lines(&mut self) -> Vec<String> {
        Vec::new()
    }
}

/// Most frequent color; ties go to the color seen first.
pub fn dominant_color(samples: &[Color]) -> Option<Color> {
    color_counts(samples, usize::MAX)
        .into_iter()
        .next()
        .map(|(color, _)| color)
}

/// Up to `limit` colors with their counts, most frequent first, ties in first-seen order.
pub fn color_counts(samples: &[Color], limit: usize) -> Vec<(Color, usize)> {
    let mut counts = HashMap::<Color, usize>::new();
    let mut order = Vec::new();
    for color in samples {
        let count = counts.entry(*color).or_insert(0);
        if *count == 0 {
            order.push(*color);
        }
        *count += 1;
    }
    order
        .into_iter()
        .map(|color| (color, counts[&color]))
        // Stable sort keeps first-seen order among equal counts.
        .sorted_by(|a, b| b.1.cmp(&a.1))
        .take(limit)
        .collect()
}

/// Samples screen colors through a fallback chain of capture strategies.
pub struct PixelSampler {
    strategies: Vec<Box<dyn CaptureStrategy>>,
    layout: Box<dyn DisplayLayout>,
    budget: Duration,
    announced: HashSet<CaptureMethod>,
    demoted: HashSet<CaptureMethod>,
    reported: HashSet<String>,
    log_lines: Vec<String>,
}

impl PixelSampler {
    /// Sampler with the platform's strategies and live monitor layout.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self::with_strategies(default_strategies(), Box::new(SystemLayout))
    }

    pub fn with_strategies(
        strategies: Vec<Box<dyn CaptureStrategy>>,
        layout: Box<dyn DisplayLayout>,
    ) -> Self {
        debug!(
            "capture strategies: {}",
            strategies.iter().map(|s| s.method()).join(", ")
        );
        Self {
            strategies,
            layout,
            budget: DEFAULT_STRATEGY_BUDGET,
            announced: HashSet::new(),
            demoted: HashSet::new(),
            reported: HashSet::new(),
            log_lines: Vec::new(),
        }
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    fn log_once(&mut self, message: String) {
        if self.reported.insert(message.clone()) {
            warn!("{message}");
            self.log_lines.push(message);
        }
    }

    fn announce(&mut self, method: CaptureMethod) {
        if self.announced.insert(method) {
            let message = format!("Capture method: {method}");
            info!("{message}");
            self.log_lines.push(message);
        }
    }

    fn report_failure(&mut self, method: CaptureMethod, err: &anyhow::Error) {
        debug!(%method, "capture failed: {err:?}");
        let issue = CaptureIssue::classify(err);
        self.log_once(issue.to_string());
    }

    fn screen(&mut self) -> Option<VirtualScreen> {
        match self.layout.query() {
            Ok(screen) => Some(screen),
            Err(err) => {
                self.log_once(format!("Failed to query monitor layout: {err:#}"));
                None
            }
        }
    }
}

impl PixelSource for PixelSampler {
    fn sample(&mut self, point: ScreenPoint) -> Sample {
        let screen = self.screen();
        if let Some(screen) = &screen {
            if !screen.contains(point) {
                debug!(%point, "point is outside the virtual screen");
                return Sample::sentinel();
            }
        }

        for index in 0..self.strategies.len() {
            let method = self.strategies[index].method();
            if self.demoted.contains(&method) {
                continue;
            }
            let started = Instant::now();
            let result = self.strategies[index].capture(point, screen.as_ref());
            let elapsed = started.elapsed();
            if elapsed > self.budget {
                self.demoted.insert(method);
                self.log_once(format!(
                    "Capture method {method} took {} ms, not using it anymore",
                    elapsed.as_millis()
                ));
            }
            match result {
                Ok(samples) if !samples.is_empty() => {
                    self.announce(method);
                    return Sample::from_samples(samples, method);
                }
                Ok(_) => {}
                Err(err) => self.report_failure(method, &err),
            }
        }
        Sample::sentinel()
    }

    fn take_log_lines(&mut self) -> Vec<String> {
        std::mem::take(&mut self.log_lines)
    }
}
