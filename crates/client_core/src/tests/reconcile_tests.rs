use super::*;

fn predicted(entries: &[(&str, PredictedMetrics)]) -> BTreeMap<String, PredictedMetrics> {
    entries
        .iter()
        .map(|(label, metrics)| (label.to_string(), *metrics))
        .collect()
}

fn assert_sorted(series: &ReconciledSeries) {
    for pair in series.points().windows(2) {
        let ordered = (pair[0].year_key, pair[0].year_label.as_str())
            < (pair[1].year_key, pair[1].year_label.as_str());
        assert!(ordered, "out of order: {:?} then {:?}", pair[0], pair[1]);
    }
}

#[test]
fn year_key_reads_academic_ranges_and_plain_years() {
    assert_eq!(year_key("2023-24"), 2023);
    assert_eq!(year_key("2023\u{2013}24"), 2023);
    assert_eq!(year_key("2019/20"), 2019);
    assert_eq!(year_key("2024"), 2024);
    assert_eq!(year_key("23"), 23);
    assert_eq!(year_key(" 2021-22 "), 2021);
}

#[test]
fn year_key_falls_back_to_second_segment_then_zero() {
    assert_eq!(year_key("FY-24"), 24);
    assert_eq!(year_key(""), 0);
    assert_eq!(year_key("unknown"), 0);
    assert_eq!(year_key("a-b"), 0);
    assert_eq!(year_key("2023 (batch)"), 2023);
}

#[test]
fn merges_history_with_future_predictions() {
    let historical = vec![
        HistoricalRow::new("2021-22").with_placement_rate(80.0),
        HistoricalRow::new("2022-23").with_placement_rate(85.0),
    ];
    let predictions = predicted(&[
        ("2023-24", PredictedMetrics::placement(88.0)),
        ("2024-25", PredictedMetrics::placement(90.0)),
    ]);

    let series = reconcile(&historical, &predictions);

    assert_eq!(
        series.labels(),
        vec!["2021-22", "2022-23", "2023-24", "2024-25"]
    );
    let points = series.points();
    assert!(points[..2].iter().all(|p| p.has_historical() && !p.has_predicted()));
    assert!(points[2..].iter().all(|p| p.has_predicted() && !p.has_historical()));
    assert_eq!(points[0].placement_past, Some(80.0));
    assert_eq!(points[3].placement_predicted, Some(90.0));
}

#[test]
fn historical_only_input_yields_one_point_per_distinct_pair() {
    let historical = vec![
        HistoricalRow::new("2022-23").with_placement_rate(70.0),
        HistoricalRow::new("2021-22").with_salary(6.5),
        HistoricalRow::new("2022-23").with_placement_rate(72.0),
        HistoricalRow::new("2022").with_placement_rate(71.0),
    ];

    let series = reconcile(&historical, &BTreeMap::new());

    assert_eq!(series.len(), 3);
    assert!(series.iter().all(|p| p.has_historical() && !p.has_predicted()));
    assert_eq!(series.get("2022-23").unwrap().placement_past, Some(72.0));
    assert_eq!(series.labels(), vec!["2021-22", "2022", "2022-23"]);
}

#[test]
fn matching_prediction_fills_existing_point_without_touching_history() {
    let historical = vec![HistoricalRow {
        year_label: "2023-24".into(),
        placement_rate: Some(81.0),
        salary: Some(6.0),
        placed_students: Some(300.0),
    }];
    let predictions = predicted(&[(
        "2023-24",
        PredictedMetrics {
            placement_rate: Some(84.0),
            salary: None,
            placed_students: Some(310.0),
        },
    )]);

    let series = reconcile(&historical, &predictions);

    assert_eq!(series.len(), 1);
    let point = &series.points()[0];
    assert_eq!(point.placement_past, Some(81.0));
    assert_eq!(point.salary_past, Some(6.0));
    assert_eq!(point.placed_past, Some(300.0));
    assert_eq!(point.placement_predicted, Some(84.0));
    assert_eq!(point.salary_predicted, None);
    assert_eq!(point.placed_predicted, Some(310.0));
}

#[test]
fn same_key_with_different_label_stays_separate() {
    let historical = vec![HistoricalRow::new("2023").with_placement_rate(75.0)];
    let predictions = predicted(&[("2023-24", PredictedMetrics::placement(79.0))]);

    let series = reconcile(&historical, &predictions);

    assert_eq!(series.labels(), vec!["2023", "2023-24"]);
    assert!(series.iter().all(|p| p.year_key == 2023));
    assert_sorted(&series);
}

#[test]
fn merge_predicted_overwrites_previous_prediction_wholesale() {
    let mut builder = SeriesBuilder::new();
    builder
        .push_historical(&HistoricalRow::new("2024-25").with_placement_rate(60.0))
        .merge_predicted(
            "2024-25",
            &PredictedMetrics {
                placement_rate: Some(70.0),
                salary: Some(8.0),
                placed_students: None,
            },
        )
        .merge_predicted("2024-25", &PredictedMetrics::placement(75.0));

    let series = builder.finish();

    assert_eq!(series.len(), 1);
    let point = &series.points()[0];
    assert_eq!(point.placement_past, Some(60.0));
    assert_eq!(point.placement_predicted, Some(75.0));
    assert_eq!(point.salary_predicted, None);
}

#[test]
fn unparseable_labels_sort_first_deterministically() {
    let historical = vec![
        HistoricalRow::new("2022-23").with_placement_rate(90.0),
        HistoricalRow::new("unknown").with_placement_rate(10.0),
        HistoricalRow::new("").with_placement_rate(20.0),
    ];
    let predictions = predicted(&[("2021-22", PredictedMetrics::placement(50.0))]);

    let series = reconcile(&historical, &predictions);

    assert_eq!(series.labels(), vec!["", "unknown", "2021-22", "2022-23"]);
    assert_sorted(&series);
}

#[test]
fn reconciling_twice_gives_identical_series() {
    let historical = vec![
        HistoricalRow::new("2020-21").with_placement_rate(66.0),
        HistoricalRow::new("2021-22").with_placement_rate(69.0),
    ];
    let predictions = predicted(&[
        ("2021-22", PredictedMetrics::placement(70.0)),
        ("2022-23", PredictedMetrics::placement(73.0)),
    ]);

    let first = reconcile(&historical, &predictions);
    let second = reconcile(&historical, &predictions);

    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
}

#[test]
fn missing_metrics_serialise_as_explicit_nulls() {
    let series = reconcile(
        &[HistoricalRow::new("2022-23").with_placement_rate(0.0)],
        &BTreeMap::new(),
    );

    let json = serde_json::to_value(&series).expect("serialise");
    let point = &json[0];
    assert_eq!(point["yearLabel"], "2022-23");
    assert_eq!(point["yearKey"], 2022);
    assert_eq!(point["placementPast"], 0.0);
    assert!(point.as_object().unwrap().contains_key("salaryPredicted"));
    assert!(point["salaryPredicted"].is_null());
}

#[test]
fn historical_row_from_table_record() {
    let record = PlacementRecord {
        year: Some("2021-22".into()),
        placement_percentage: Some(82.5),
        median_salary: Some(7.2),
        students_placed: Some(410.0),
        ..PlacementRecord::default()
    };
    let row = HistoricalRow::from(&record);
    assert_eq!(row.year_label, "2021-22");
    assert_eq!(row.placement_rate, Some(82.5));
    assert_eq!(row.salary, Some(7.2));
    assert_eq!(row.placed_students, Some(410.0));
}
