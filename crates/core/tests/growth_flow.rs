//! End-to-end flow over the file repository and the bundled WHO table.

use chrono::NaiveDate;
use growth_core::analytics::{CompareMode, CompareParams};
use growth_core::lms::LmsParams;
use growth_core::reference::ReferencePoint;
use growth_core::repositories::{NewMeasurement, PatientRecord};
use growth_core::{
    AccessContext, ChartType, Classification, CoreConfig, FileRepository, Gender, GrowthError,
    GrowthService, MokaCache, NoopCache, NonEmptyText, PatientId, ReferenceTable,
};
use std::sync::Arc;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn setup(dir: &std::path::Path) -> (GrowthService, Arc<FileRepository>, PatientRecord) {
    let repo = Arc::new(FileRepository::new(dir));
    let patient = PatientRecord {
        id: PatientId::new(),
        date_of_birth: date(2024, 1, 1),
        gender: Gender::Male,
        tenant_id: NonEmptyText::new("clinic-a").unwrap(),
    };
    repo.create_patient(&patient).unwrap();

    let cfg = Arc::new(CoreConfig::new(dir.to_path_buf(), None));
    let service = GrowthService::new(
        cfg,
        Arc::new(ReferenceTable::bundled().unwrap()),
        repo.clone(),
        Arc::new(MokaCache::new(1_000)),
    );
    (service, repo, patient)
}

#[test]
fn interpolated_median_scores_zero() {
    let row = |age_days| {
        ReferencePoint::from_lms(
            Gender::Male,
            ChartType::WeightForAge,
            age_days,
            LmsParams::new(1.0, 3.3, 0.15).unwrap(),
        )
        .unwrap()
    };
    let table = ReferenceTable::from_points("two rows", [row(0), row(30)]).unwrap();
    let temp = tempfile::tempdir().unwrap();
    let service = GrowthService::new(
        Arc::new(CoreConfig::new(temp.path().to_path_buf(), None)),
        Arc::new(table),
        Arc::new(FileRepository::new(temp.path())),
        Arc::new(NoopCache),
    );

    let result = service
        .calculate_z_score(Gender::Male, ChartType::WeightForAge, 15, 3.3)
        .unwrap();
    assert_eq!(result.z_score, 0.0);
    assert_eq!(result.percentile, 50.0);
    assert_eq!(result.classification, Classification::Normal);
}

#[test]
fn record_then_analyse_a_first_year() {
    let temp = tempfile::tempdir().unwrap();
    let (service, _repo, patient) = setup(temp.path());
    let ctx = AccessContext::for_tenant("clinic-a").unwrap();

    for (d, kg, cm) in [
        (date(2024, 1, 1), 3.3, 49.9),
        (date(2024, 2, 1), 4.5, 54.7),
        (date(2024, 3, 2), 5.6, 58.4),
        (date(2024, 4, 1), 6.4, 61.4),
    ] {
        service
            .record_measurement(
                &ctx,
                &patient.id,
                NewMeasurement {
                    date: d,
                    weight: Some(kg),
                    height: Some(cm),
                    head_circumference: None,
                },
            )
            .unwrap();
    }

    let trends = service
        .get_growth_trends(&ctx, &patient.id, ChartType::WeightForAge, None)
        .unwrap();
    assert_eq!(trends.trends.len(), 4);
    assert!(trends.trends.iter().all(|p| p.classification.is_normal()));
    assert!(trends.velocity.unwrap().per_month > 0.0);

    let velocity = service
        .calculate_velocity(
            &ctx,
            &patient.id,
            ChartType::HeightForAge,
            Some(date(2024, 2, 1)),
            Some(date(2024, 4, 1)),
        )
        .unwrap()
        .unwrap();
    assert_eq!(velocity.delta_days, 60);
    assert_eq!(velocity.unit, "cm");

    let projection = service
        .get_growth_projection(&ctx, &patient.id, ChartType::WeightForAge, 12)
        .unwrap()
        .unwrap();
    assert_eq!(projection.projections.len(), 4);
    assert!(projection.projections[0].confidence > projection.projections[3].confidence);

    let age = service
        .compare_growth(
            &ctx,
            &patient.id,
            CompareMode::Age,
            &CompareParams {
                reference_age_months: Some(1.0),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(age.status, "ahead");
}

#[test]
fn head_circumference_has_no_data_until_measured() {
    let temp = tempfile::tempdir().unwrap();
    let (service, _repo, patient) = setup(temp.path());
    let ctx = AccessContext::for_tenant("clinic-a").unwrap();

    let params = CompareParams {
        chart_type: ChartType::HeadCircumferenceForAge,
        ..Default::default()
    };
    let cmp = service
        .compare_growth(&ctx, &patient.id, CompareMode::Percentile, &params)
        .unwrap();
    assert_eq!(cmp.status, "no_data");

    service
        .record_measurement(
            &ctx,
            &patient.id,
            NewMeasurement {
                date: date(2024, 1, 15),
                head_circumference: Some(35.5),
                ..Default::default()
            },
        )
        .unwrap();
    let cmp = service
        .compare_growth(&ctx, &patient.id, CompareMode::Percentile, &params)
        .unwrap();
    assert_eq!(cmp.status, "normal");
}

#[test]
fn foreign_tenant_and_unknown_patient() {
    let temp = tempfile::tempdir().unwrap();
    let (service, _repo, patient) = setup(temp.path());

    let other = AccessContext::for_tenant("clinic-b").unwrap();
    let err = service
        .get_growth_projection(&other, &patient.id, ChartType::WeightForAge, 6)
        .unwrap_err();
    assert!(matches!(err, GrowthError::Forbidden(_)));

    let ctx = AccessContext::for_tenant("clinic-a").unwrap();
    let err = service
        .get_growth_trends(&ctx, &PatientId::new(), ChartType::WeightForAge, None)
        .unwrap_err();
    assert!(matches!(err, GrowthError::NotFound(_)));
}

#[test]
fn measurement_before_birth_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let (service, _repo, patient) = setup(temp.path());
    let ctx = AccessContext::for_tenant("clinic-a").unwrap();
    let err = service
        .record_measurement(
            &ctx,
            &patient.id,
            NewMeasurement {
                date: date(2023, 12, 1),
                weight: Some(3.0),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, GrowthError::InvalidInput(_)));
}
