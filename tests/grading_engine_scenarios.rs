use gradingd::config::CalcConfig;
use gradingd::grading::{
    compute_aggregate, resolve, validate, validate_all, GradeError, GradeRange,
};
use gradingd::presets::Scale;
use gradingd::report::{build_report_card, SubjectScore};

fn r(grade: &str, min: f64, max: f64, gp: f64) -> GradeRange {
    GradeRange::new(grade, min, max, gp)
}

#[test]
fn state_board_end_to_end() {
    let scale = vec![
        r("A", 80.0, 100.0, 9.0),
        r("B", 70.0, 79.0, 7.0),
        r("C", 60.0, 69.0, 5.0),
        r("D", 50.0, 59.0, 3.0),
        r("E", 35.0, 49.0, 1.0),
        r("F", 0.0, 34.0, 0.0),
    ];
    assert_eq!(validate(&scale), Ok(()));

    let c = resolve(&scale, 65.0).expect("65 resolves");
    assert_eq!(c.grade, "C");
    assert_eq!(c.grade_point, 5.0);
    assert_eq!(resolve(&scale, 34.0).map(|g| g.grade.as_str()), Some("F"));

    let preset: Vec<(String, f64, f64, f64)> = Scale::StateBoard
        .ranges()
        .into_iter()
        .map(|g| (g.grade, g.min_marks, g.max_marks, g.grade_point))
        .collect();
    let built: Vec<(String, f64, f64, f64)> = scale
        .into_iter()
        .map(|g| (g.grade, g.min_marks, g.max_marks, g.grade_point))
        .collect();
    assert_eq!(preset, built);
}

#[test]
fn cbse_boundaries_resolve_to_expected_grades() {
    let cbse = Scale::Cbse.ranges();
    assert_eq!(validate(&cbse), Ok(()));
    for (pct, grade) in [(91.0, "A1"), (90.0, "A2"), (0.0, "E2"), (100.0, "A1")] {
        assert_eq!(
            resolve(&cbse, pct).map(|g| g.grade.as_str()),
            Some(grade),
            "percentage {}",
            pct
        );
    }
    // Non-integer values between ranges have no grade.
    assert!(resolve(&cbse, 90.5).is_none());
}

#[test]
fn every_preset_is_valid() {
    for scale in Scale::PRESETS {
        let ranges = scale.ranges();
        assert!(!ranges.is_empty(), "{} has ranges", scale.key());
        assert_eq!(validate(&ranges), Ok(()), "{} validates", scale.key());
    }
    assert!(Scale::Custom.ranges().is_empty());
}

#[test]
fn verdict_is_stable_across_orderings_and_repeats() {
    let mut ranges = vec![
        r("P", 40.0, 100.0, 1.0),
        r("F", 0.0, 40.0, 0.0),
        r("X", 20.0, 30.0, 0.0),
    ];
    let first = validate(&ranges);
    assert_eq!(validate(&ranges), first);
    assert!(matches!(first, Err(GradeError::OverlappingRanges { .. })));

    ranges.reverse();
    assert!(matches!(
        validate(&ranges),
        Err(GradeError::OverlappingRanges { .. })
    ));
    ranges.rotate_left(1);
    assert!(matches!(
        validate(&ranges),
        Err(GradeError::OverlappingRanges { .. })
    ));
}

#[test]
fn exhaustive_validation_reports_each_problem() {
    let ranges = vec![
        r("Low", -5.0, 10.0, 0.0),
        r("High", 95.0, 105.0, 4.0),
        r("Mid", 40.0, 60.0, 2.0),
        r("Mid2", 60.0, 70.0, 3.0),
    ];
    let errors = validate_all(&ranges);
    let kinds: Vec<&str> = errors.iter().map(|e| e.kind()).collect();
    assert_eq!(
        kinds,
        vec!["boundsOutOfDomain", "overlappingRanges", "boundsOutOfDomain"]
    );
    assert_eq!(validate(&ranges), Err(errors[0].clone()));
}

#[test]
fn report_card_aggregates_graded_subjects() {
    let subjects = vec![
        SubjectScore::from_percentage("English", 95.0),
        SubjectScore::from_percentage("Maths", 85.0),
        SubjectScore::from_total("Science", 37.5, 50.0),
        SubjectScore::from_percentage("Hindi", 65.0),
    ];
    let card = build_report_card(&Scale::Cbse.ranges(), &subjects, &CalcConfig::default());
    let grades: Vec<Option<&str>> = card.rows.iter().map(|row| row.grade.as_deref()).collect();
    assert_eq!(
        grades,
        vec![Some("A1"), Some("A2"), Some("B1"), Some("B2")]
    );
    assert_eq!(card.cgpa, 8.5);
    assert_eq!(card.graded_count, 4);
    assert_eq!(card.ungraded_count, 0);

    assert_eq!(compute_aggregate([10.0, 9.0, 8.0, 7.0]), 8.5);
    assert_eq!(compute_aggregate(Vec::<f64>::new()), 0.0);
}
