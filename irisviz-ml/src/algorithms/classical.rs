//! Classical algorithm definitions and their construction.

use serde::{Deserialize, Serialize};

use super::{
    Classifier, GaussianNaiveBayes, KNeighborsClassifier, LogisticRegression,
    SupportVectorClassifier,
};
use crate::config::{KnnConfig, LogisticConfig, ModelsConfig, NaiveBayesConfig, SvmConfig};

/// The estimators a pipeline can wrap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum ClassicalAlgorithm {
    LogisticRegression(LogisticConfig),
    Knn(KnnConfig),
    Svm(SvmConfig),
    NaiveBayes(NaiveBayesConfig),
}

impl ClassicalAlgorithm {
    /// Label used in chart titles and reports.
    pub fn display_name(&self) -> String {
        match self {
            Self::LogisticRegression(_) => "Log Reg".to_string(),
            Self::Knn(cfg) => format!("KNN (k={})", cfg.k),
            Self::Svm(_) => "SVM (RBF)".to_string(),
            Self::NaiveBayes(_) => "Naive Bayes".to_string(),
        }
    }

    /// Construct a fresh, unfit estimator.
    pub fn build(&self) -> Box<dyn Classifier> {
        match self {
            Self::LogisticRegression(cfg) => Box::new(LogisticRegression::new(cfg.clone())),
            Self::Knn(cfg) => Box::new(KNeighborsClassifier::new(cfg.k)),
            Self::Svm(cfg) => Box::new(SupportVectorClassifier::new(cfg.clone())),
            Self::NaiveBayes(cfg) => Box::new(GaussianNaiveBayes::new(cfg.var_smoothing)),
        }
    }

    /// The fixed four-model lineup, in display order.
    pub fn lineup(models: &ModelsConfig) -> Vec<Self> {
        vec![
            Self::LogisticRegression(models.logistic.clone()),
            Self::Knn(models.knn.clone()),
            Self::Svm(models.svm.clone()),
            Self::NaiveBayes(models.naive_bayes.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lineup_names() {
        let names: Vec<String> = ClassicalAlgorithm::lineup(&ModelsConfig::default())
            .iter()
            .map(|a| a.display_name())
            .collect();
        assert_eq!(names, vec!["Log Reg", "KNN (k=5)", "SVM (RBF)", "Naive Bayes"]);
    }

    #[test]
    fn test_serde_tagging() {
        let algo = ClassicalAlgorithm::Knn(KnnConfig { k: 3 });
        let json = serde_json::to_value(&algo).unwrap();
        assert_eq!(json["algorithm"], "knn");
        assert_eq!(json["k"], 3);
    }
}
