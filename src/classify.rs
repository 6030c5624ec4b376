//! Classifier (§6.6): a TF-IDF vectorizer (`max_df=0.95`, `min_df=2`) feeding
//! a multinomial naive Bayes model with Laplace smoothing, trained offline
//! and persisted as an opaque artifact. Mirrors
//! `backend/classification/classifier.py`'s `TfidfVectorizer` + `MultinomialNB`
//! pipeline and its train/evaluate/refit-on-full-data protocol.

use crate::tfidf::{FitOptions, Model, SparseRow};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Schema version for the persisted classifier artifact.
pub const SCHEMA_VERSION: u32 = 1;

/// Laplace smoothing constant, per spec §6.6 (`alpha=0.1` in the source).
pub const ALPHA: f32 = 0.1;

/// Vocabulary pruning thresholds the training vectorizer uses (spec §6.6),
/// distinct from the retrieval core's field vectorizers, which keep
/// everything (`tfidf::FitOptions::default()`).
pub fn training_fit_options() -> FitOptions {
    FitOptions {
        max_df: 0.95,
        min_df: 2,
    }
}

/// A multinomial naive Bayes model over TF-IDF-weighted sparse rows.
/// `feature_log_prob[c][f]` is `log P(feature f | class c)`, computed with
/// Laplace/Lidstone smoothing so no class ever assigns a feature zero
/// probability outright.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NaiveBayes {
    n_features: usize,
    class_log_prior: Vec<f32>,
    feature_log_prob: Vec<Vec<f32>>,
    alpha: f32,
}

impl NaiveBayes {
    /// Fits class priors and per-feature log-probabilities from TF-IDF rows
    /// and integer class labels (0-based, dense).
    pub fn fit(rows: &[SparseRow], labels: &[usize], n_classes: usize, n_features: usize, alpha: f32) -> NaiveBayes {
        let mut class_counts = vec![0usize; n_classes];
        let mut feature_sums = vec![vec![0f32; n_features]; n_classes];
        let mut class_totals = vec![0f32; n_classes];

        for (row, &label) in rows.iter().zip(labels) {
            class_counts[label] += 1;
            for &(idx, weight) in row {
                // TF-IDF weights are non-negative by construction; multinomial
                // NB treats them as pseudo-counts, matching sklearn's
                // `MultinomialNB` fed a TF-IDF matrix directly.
                let w = weight.max(0.0);
                feature_sums[label][idx as usize] += w;
                class_totals[label] += w;
            }
        }

        let n_docs: usize = class_counts.iter().sum();
        let class_log_prior: Vec<f32> = class_counts
            .iter()
            .map(|&c| ((c as f32) / (n_docs as f32)).ln())
            .collect();

        let feature_log_prob: Vec<Vec<f32>> = (0..n_classes)
            .map(|c| {
                let denom = class_totals[c] + alpha * n_features as f32;
                feature_sums[c]
                    .iter()
                    .map(|&sum| ((sum + alpha) / denom).ln())
                    .collect()
            })
            .collect();

        NaiveBayes {
            n_features,
            class_log_prior,
            feature_log_prob,
            alpha,
        }
    }

    /// Unnormalized joint log-likelihood `log P(class) + sum_f x_f * log P(f|class)`
    /// for each class, in class-index order.
    pub fn predict_log_proba(&self, row: &SparseRow) -> Vec<f32> {
        self.class_log_prior
            .iter()
            .enumerate()
            .map(|(c, &prior)| {
                prior
                    + row
                        .iter()
                        .map(|&(idx, weight)| weight * self.feature_log_prob[c][idx as usize])
                        .sum::<f32>()
            })
            .collect()
    }

    /// Log-probabilities normalized into a proper distribution via log-sum-exp.
    pub fn predict_proba(&self, row: &SparseRow) -> Vec<f32> {
        let log_probs = self.predict_log_proba(row);
        let max = log_probs.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let sum_exp: f32 = log_probs.iter().map(|&lp| (lp - max).exp()).sum();
        let log_sum_exp = max + sum_exp.ln();
        log_probs.iter().map(|&lp| (lp - log_sum_exp).exp()).collect()
    }

    pub fn predict(&self, row: &SparseRow) -> usize {
        self.predict_log_proba(row)
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(idx, _)| idx)
            .unwrap_or(0)
    }
}

/// The persisted, opaque classifier artifact: callers only ever see
/// `predict`/`predict_proba`, never the naive Bayes internals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classifier {
    schema_version: u32,
    vectorizer: Model,
    nb: NaiveBayes,
    labels: Vec<String>,
}

impl Classifier {
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn predict(&self, text: &str) -> &str {
        let row = self.vectorizer.transform_query(text);
        let class = self.nb.predict(&row);
        &self.labels[class]
    }

    pub fn predict_proba(&self, text: &str) -> Vec<(String, f32)> {
        let row = self.vectorizer.transform_query(text);
        let probs = self.nb.predict_proba(&row);
        self.labels.iter().cloned().zip(probs).collect()
    }

    pub fn save_atomic(&self, path: &Path) -> anyhow::Result<()> {
        let bytes = postcard::to_allocvec(self)?;
        let tmp_path = path.with_extension("tmp");
        {
            use std::io::Write;
            let mut f = std::fs::File::create(&tmp_path)?;
            f.write_all(&bytes)?;
            f.sync_all()?;
        }
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Classifier, crate::error::CoreError> {
        let bytes = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                crate::error::CoreError::not_ready(
                    "classifier",
                    format!("artifact not found at {}", path.display()),
                )
            } else {
                crate::error::CoreError::Fatal {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        let classifier: Classifier = postcard::from_bytes(&bytes)
            .map_err(|e| crate::error::CoreError::corrupt(path, format!("deserialization failed: {e}")))?;

        if classifier.schema_version != SCHEMA_VERSION {
            return Err(crate::error::CoreError::corrupt(
                path,
                format!(
                    "schema version mismatch: artifact has {}, expected {SCHEMA_VERSION}",
                    classifier.schema_version
                ),
            ));
        }

        Ok(classifier)
    }
}

/// One labeled training example: title+content combined into a single text
/// field, paired with its category string (`Title`/`Content`/`Category`
/// columns in the source CSV).
pub struct LabeledExample {
    pub text: String,
    pub label: String,
}

/// Reads a labeled CSV with `Title`, `Content`, `Category` columns, dropping
/// rows with any of the three missing or empty (the source's
/// `dropna(subset=[...])` behavior).
pub fn load_labeled_csv(path: &Path) -> anyhow::Result<Vec<LabeledExample>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let title_idx = headers
        .iter()
        .position(|h| h == "Title")
        .ok_or_else(|| anyhow::anyhow!("labeled CSV is missing a 'Title' column"))?;
    let content_idx = headers
        .iter()
        .position(|h| h == "Content")
        .ok_or_else(|| anyhow::anyhow!("labeled CSV is missing a 'Content' column"))?;
    let category_idx = headers
        .iter()
        .position(|h| h == "Category")
        .ok_or_else(|| anyhow::anyhow!("labeled CSV is missing a 'Category' column"))?;

    let mut examples = Vec::new();
    for record in reader.records() {
        let record = record?;
        let title = record.get(title_idx).unwrap_or("").trim();
        let content = record.get(content_idx).unwrap_or("").trim();
        let category = record.get(category_idx).unwrap_or("").trim();
        if title.is_empty() || content.is_empty() || category.is_empty() {
            continue;
        }
        examples.push(LabeledExample {
            text: format!("{title} {content}"),
            label: category.to_string(),
        });
    }
    Ok(examples)
}

/// Evaluation metrics from the held-out split, logged (never silently
/// dropped) before the production refit.
#[derive(Debug, Clone, Copy)]
pub struct EvalMetrics {
    pub accuracy: f32,
    pub macro_f1: f32,
}

/// Deterministic stratified 80/20 split: within each label group, every
/// 5th example (by original order) goes to the test set. No RNG dependency
/// is pulled in for this — the split only needs to be representative and
/// reproducible, not random.
fn stratified_split(examples: &[LabeledExample]) -> (Vec<usize>, Vec<usize>) {
    use ahash::AHashMap;
    let mut by_label: AHashMap<&str, Vec<usize>> = AHashMap::new();
    for (i, ex) in examples.iter().enumerate() {
        by_label.entry(ex.label.as_str()).or_default().push(i);
    }

    let mut train = Vec::new();
    let mut test = Vec::new();
    for indices in by_label.values() {
        for (pos, &idx) in indices.iter().enumerate() {
            if pos % 5 == 4 {
                test.push(idx);
            } else {
                train.push(idx);
            }
        }
    }
    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}

fn label_names(examples: &[LabeledExample]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for ex in examples {
        if !names.contains(&ex.label) {
            names.push(ex.label.clone());
        }
    }
    names
}

fn fit_nb(examples: &[LabeledExample], indices: &[usize], labels: &[String]) -> (Model, NaiveBayes) {
    let texts: Vec<String> = indices.iter().map(|&i| examples[i].text.clone()).collect();
    let label_ids: Vec<usize> = indices
        .iter()
        .map(|&i| labels.iter().position(|l| l == &examples[i].label).unwrap())
        .collect();

    let vectorizer = Model::fit(&texts, training_fit_options());
    let rows: Vec<SparseRow> = (0..texts.len()).map(|i| vectorizer.row(i).cloned().unwrap_or_default()).collect();
    let n_features = vectorizer.vocabulary().len();
    let nb = NaiveBayes::fit(&rows, &label_ids, labels.len(), n_features, ALPHA);
    (vectorizer, nb)
}

fn evaluate(vectorizer: &Model, nb: &NaiveBayes, examples: &[LabeledExample], test: &[usize], labels: &[String]) -> EvalMetrics {
    let n_classes = labels.len();
    let mut confusion = vec![vec![0usize; n_classes]; n_classes];

    for &i in test {
        let row = vectorizer.transform_query(&examples[i].text);
        let predicted = nb.predict(&row);
        let actual = labels.iter().position(|l| l == &examples[i].label).unwrap();
        confusion[actual][predicted] += 1;
    }

    let total: usize = confusion.iter().flatten().sum();
    let correct: usize = (0..n_classes).map(|c| confusion[c][c]).sum();
    let accuracy = if total == 0 { 0.0 } else { correct as f32 / total as f32 };

    let mut f1_sum = 0.0f32;
    for c in 0..n_classes {
        let tp = confusion[c][c] as f32;
        let fp: f32 = (0..n_classes).filter(|&r| r != c).map(|r| confusion[r][c] as f32).sum();
        let fn_: f32 = (0..n_classes).filter(|&p| p != c).map(|p| confusion[c][p] as f32).sum();
        let precision = if tp + fp > 0.0 { tp / (tp + fp) } else { 0.0 };
        let recall = if tp + fn_ > 0.0 { tp / (tp + fn_) } else { 0.0 };
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        f1_sum += f1;
    }
    let macro_f1 = if n_classes == 0 { 0.0 } else { f1_sum / n_classes as f32 };

    EvalMetrics { accuracy, macro_f1 }
}

/// Trains a classifier from labeled examples: split, fit, evaluate on the
/// 20% held out, log the metrics, then refit on 100% of the data for the
/// artifact that's actually persisted — the source's train/evaluate/refit
/// protocol.
pub fn train(examples: &[LabeledExample]) -> anyhow::Result<(Classifier, EvalMetrics)> {
    if examples.is_empty() {
        anyhow::bail!("cannot train a classifier from zero labeled examples");
    }

    let labels = label_names(examples);
    let (train_idx, test_idx) = stratified_split(examples);

    let metrics = if test_idx.is_empty() {
        tracing::warn!("labeled set too small to hold out a test split; skipping evaluation");
        EvalMetrics {
            accuracy: f32::NAN,
            macro_f1: f32::NAN,
        }
    } else {
        let (eval_vectorizer, eval_nb) = fit_nb(examples, &train_idx, &labels);
        let metrics = evaluate(&eval_vectorizer, &eval_nb, examples, &test_idx, &labels);
        tracing::info!(
            accuracy = metrics.accuracy,
            macro_f1 = metrics.macro_f1,
            "classifier evaluation on held-out split"
        );
        metrics
    };

    let all_indices: Vec<usize> = (0..examples.len()).collect();
    let (vectorizer, nb) = fit_nb(examples, &all_indices, &labels);

    Ok((
        Classifier {
            schema_version: SCHEMA_VERSION,
            vectorizer,
            nb,
            labels,
        },
        metrics,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_examples() -> Vec<LabeledExample> {
        let mut examples = Vec::new();
        for _ in 0..8 {
            examples.push(LabeledExample {
                text: "risk management banking finance capital".into(),
                label: "finance".into(),
            });
            examples.push(LabeledExample {
                text: "election politics voters campaign government".into(),
                label: "politics".into(),
            });
        }
        examples
    }

    #[test]
    fn predicts_the_matching_class_for_clear_text() {
        let examples = toy_examples();
        let (classifier, metrics) = train(&examples).unwrap();
        assert!(!metrics.accuracy.is_nan());
        assert_eq!(classifier.predict("risk management and banking capital"), "finance");
        assert_eq!(classifier.predict("election campaign and voters"), "politics");
    }

    #[test]
    fn predict_proba_sums_to_one() {
        let examples = toy_examples();
        let (classifier, _) = train(&examples).unwrap();
        let probs = classifier.predict_proba("banking risk");
        let sum: f32 = probs.iter().map(|(_, p)| p).sum();
        assert!((sum - 1.0).abs() < 1e-4);
    }

    #[test]
    fn save_and_load_round_trips() {
        let examples = toy_examples();
        let (classifier, _) = train(&examples).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classifier.bin");
        classifier.save_atomic(&path).unwrap();

        let loaded = Classifier::load(&path).unwrap();
        assert_eq!(loaded.labels(), classifier.labels());
        assert_eq!(loaded.predict("risk banking"), classifier.predict("risk banking"));
    }

    #[test]
    fn load_missing_file_is_not_ready() {
        let result = Classifier::load(Path::new("/nonexistent/path/classifier.bin"));
        assert!(matches!(result, Err(crate::error::CoreError::NotReady { .. })));
    }

    #[test]
    fn csv_loader_skips_rows_with_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labeled.csv");
        std::fs::write(
            &path,
            "Title,Content,Category\n\
             Risk Study,Banks face new capital rules,finance\n\
             ,Missing title row,finance\n\
             Election Watch,Voters head to the polls,politics\n",
        )
        .unwrap();

        let examples = load_labeled_csv(&path).unwrap();
        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0].label, "finance");
        assert_eq!(examples[1].label, "politics");
    }
}
