//! Batch grading through the port traits, as a front end drives it.

#![allow(clippy::unwrap_used)]

use produce_qa_core::scoring::QualityTrend;
use produce_qa_core::{
    GradingRequest, ImageSource, ProgressEvent, ProgressSink, QualityAssessor, QualityInsights,
    ReportOutput, ScoringPolicy,
};
use produce_qa_test_support::{
    MockImageSource, MockProgressSink, MockReportOutput, ProduceImageBuilder,
};

fn run_batch(source: &dyn ImageSource, output: &dyn ReportOutput, progress: &dyn ProgressSink) {
    let assessor = QualityAssessor::new(ScoringPolicy::default()).unwrap();
    let total = source.count_hint();
    let mut processed = 0;
    for (index, image) in source.images().enumerate() {
        let image = image.unwrap();
        progress.on_event(ProgressEvent::Started {
            path: image.path.clone(),
            index,
            total,
        });
        let request = GradingRequest::new(format!("sku-{index}"), image);
        let report = assessor.assess(&request).unwrap();
        output.write(&report).unwrap();
        progress.on_event(ProgressEvent::Completed {
            report: Box::new(report),
        });
        processed += 1;
    }
    output.flush().unwrap();
    progress.on_event(ProgressEvent::Finished {
        processed,
        skipped: 0,
    });
}

#[test]
fn test_batch_reports_and_progress() {
    let source = MockImageSource::new(vec![
        ProduceImageBuilder::red_apple(200),
        ProduceImageBuilder::banana(300, 150),
        ProduceImageBuilder::bruised_apple(200, 7),
    ]);
    let output = MockReportOutput::new();
    let progress = MockProgressSink::new();

    run_batch(&source, &output, &progress);

    assert_eq!(source.iteration_count(), 1);
    assert_eq!(progress.started_count(), 3);
    assert_eq!(progress.completed_count(), 3);
    assert_eq!(progress.skipped_count(), 0);
    assert_eq!(progress.finished_counts(), Some((3, 0)));
    assert_eq!(output.flush_count(), 1);

    let reports = output.reports();
    let ids: Vec<_> = reports.iter().map(|r| r.product_id.as_str()).collect();
    assert_eq!(ids, ["sku-0", "sku-1", "sku-2"]);

    let insights = QualityInsights::from_reports(&reports).unwrap();
    assert_eq!(insights.summary.total_images, 3);
    assert_eq!(insights.quality_trend, QualityTrend::Declining);
    assert!(insights.summary.min_score <= insights.summary.max_score);
}

#[test]
fn test_empty_batch_has_no_insights() {
    let source = MockImageSource::empty();
    let output = MockReportOutput::new();
    let progress = MockProgressSink::new();

    run_batch(&source, &output, &progress);

    assert!(progress.has_finished());
    assert_eq!(progress.finished_counts(), Some((0, 0)));
    assert!(output.reports().is_empty());
    assert!(QualityInsights::from_reports(&output.reports()).is_none());
}
