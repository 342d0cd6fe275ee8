use chrono::{DateTime, NaiveDate, NaiveTime};
use formweave_application::{FieldWidget, NativeValue, WidgetBinding};
use formweave_domain::{FieldMetadata, InputOption, RenderMode};
use proptest::prelude::*;
use serde_json::{Value, json};

use super::{
    BooleanWidget, ChoiceKind, ChoiceWidget, FileWidget, JsonWidget, MultiChoiceWidget, NumberKind,
    NumberWidget, TemporalKind, TemporalWidget, TextKind, TextWidget, UploadTracker,
};

fn bound<W: FieldWidget>(mut widget: W, metadata: FieldMetadata, options: Vec<InputOption>) -> W {
    widget.bind(WidgetBinding {
        id: "field".to_owned(),
        label: "Field".to_owned(),
        metadata,
        options,
    });
    widget
}

fn assert_round_trip(widget: &dyn FieldWidget, transport: Value) {
    let native = widget.from_transport(&transport);
    assert!(native.is_ok(), "{} rejected {transport}", widget.input_kind());
    let native = native.unwrap_or_else(|_| unreachable!());

    let back = widget.to_transport(&native);
    assert!(back.is_ok());
    assert_eq!(back.unwrap_or_else(|_| unreachable!()), transport);
}

#[test]
fn date_widget_reads_and_writes_midnight_instants() {
    let widget = TemporalWidget::new(TemporalKind::Date);
    let native = widget.from_transport(&json!("2024-01-05T00:00:00.000Z"));
    assert!(native.is_ok());
    assert_eq!(
        native.unwrap_or_else(|_| unreachable!()),
        NativeValue::Date(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap_or_default())
    );
    assert_round_trip(&widget, json!("2024-01-05T00:00:00.000Z"));

    let plain = widget.from_transport(&json!("2024-01-05"));
    assert!(matches!(plain, Ok(NativeValue::Date(_))));
    assert!(widget.from_transport(&json!("tomorrow")).is_err());
}

#[test]
fn every_bundled_widget_round_trips_representative_values() {
    let options = vec![
        InputOption::new(json!("de"), "Germany"),
        InputOption::new(json!("fr"), "France"),
    ];

    assert_round_trip(&TextWidget::new(TextKind::Text), json!("Ada"));
    assert_round_trip(&TextWidget::new(TextKind::TextArea), json!("line one\nline two"));
    assert_round_trip(&TextWidget::new(TextKind::Email), json!("ada@example.com"));
    assert_round_trip(&TextWidget::new(TextKind::Password), json!("s3cret"));
    assert_round_trip(&NumberWidget::new(NumberKind::Number), json!(42));
    assert_round_trip(&NumberWidget::new(NumberKind::Number), json!(-3.25));
    assert_round_trip(&NumberWidget::new(NumberKind::Currency), json!(19.99));
    assert_round_trip(&BooleanWidget::default(), json!(true));
    assert_round_trip(&TemporalWidget::new(TemporalKind::DateTime), json!("2024-01-05T13:45:10.250Z"));
    assert_round_trip(&TemporalWidget::new(TemporalKind::Time), json!("08:30:00"));
    assert_round_trip(
        &bound(ChoiceWidget::new(ChoiceKind::Select), FieldMetadata::default(), options.clone()),
        json!("de"),
    );
    assert_round_trip(&ChoiceWidget::new(ChoiceKind::Radio), json!(2));
    assert_round_trip(&MultiChoiceWidget::default(), json!(["de", "fr"]));
    assert_round_trip(&JsonWidget::default(), json!({"nested": [1, 2, {"deep": true}]}));
    assert_round_trip(
        &FileWidget::default(),
        json!({"name": "cv.pdf", "url": "https://files.example.com/cv.pdf", "size": 2048, "contentType": "application/pdf"}),
    );
    for widget in [
        &TextWidget::new(TextKind::Text) as &dyn FieldWidget,
        &NumberWidget::new(NumberKind::Number),
        &TemporalWidget::new(TemporalKind::Date),
        &FileWidget::default(),
    ] {
        assert_round_trip(widget, Value::Null);
    }
}

#[test]
fn conversion_failures_are_reported_as_errors() {
    assert!(NumberWidget::new(NumberKind::Number).from_transport(&json!("abc")).is_err());
    assert!(
        NumberWidget::new(NumberKind::Number)
            .to_transport(&NativeValue::Number(f64::NAN))
            .is_err()
    );
    assert!(TextWidget::new(TextKind::Text).from_transport(&json!({"a": 1})).is_err());
    assert!(BooleanWidget::default().from_transport(&json!("maybe")).is_err());
    assert!(FileWidget::default().from_transport(&json!({"size": 10})).is_err());
    assert!(MultiChoiceWidget::default().from_transport(&json!([{"a": 1}])).is_err());
    assert!(JsonWidget::default().to_transport(&NativeValue::Text("{oops".to_owned())).is_err());
}

#[test]
fn lenient_inputs_normalize_to_transport_form() {
    let number = NumberWidget::new(NumberKind::Number);
    assert!(matches!(number.from_transport(&json!(" 12.5 ")), Ok(NativeValue::Number(value)) if value == 12.5));
    assert!(matches!(number.to_transport(&NativeValue::Number(3.0)), Ok(value) if value == json!(3)));

    let flag = BooleanWidget::default();
    assert_eq!(flag.default_transport(), json!(false));
    assert!(matches!(flag.from_transport(&json!("TRUE")), Ok(NativeValue::Boolean(true))));

    let file = FileWidget::default();
    assert!(matches!(
        file.from_transport(&json!("scan.png")),
        Ok(NativeValue::Json(value)) if value == json!({"name": "scan.png"})
    ));

    let tags = MultiChoiceWidget::default();
    assert!(tags.is_array());
    assert!(matches!(tags.from_transport(&Value::Null), Ok(NativeValue::List(items)) if items.is_empty()));
}

#[test]
fn display_text_follows_metadata_and_options() {
    let mut password = TextWidget::new(TextKind::Password);
    password.set_value(NativeValue::Text("abc".to_owned()));
    assert_eq!(password.display_text(), "•••");

    let mut price = bound(
        NumberWidget::new(NumberKind::Currency),
        FieldMetadata::default().with_attribute("currency", json!("EUR")),
        Vec::new(),
    );
    price.set_value(NativeValue::Number(12.5));
    assert_eq!(price.display_text(), "12.50 EUR");

    let mut country = bound(
        ChoiceWidget::new(ChoiceKind::Select),
        FieldMetadata::default(),
        vec![InputOption::new(json!("de"), "Germany")],
    );
    country.set_value(NativeValue::Json(json!("de")));
    assert_eq!(country.render(RenderMode::View).text, "Germany");

    let mut attachment = FileWidget::default();
    attachment.set_value(NativeValue::Json(json!({"name": "cv.pdf", "size": 2048})));
    assert_eq!(attachment.display_text(), "cv.pdf (2 KB)");
}

#[test]
fn date_metadata_switches_the_temporal_kind() {
    let with_time = bound(
        TemporalWidget::new(TemporalKind::Date),
        FieldMetadata::default().with_attribute("showTime", json!(true)),
        Vec::new(),
    );
    assert_eq!(with_time.effective_kind(), TemporalKind::DateTime);
    assert!(matches!(
        with_time.from_transport(&json!("2024-01-05T10:00:00.000Z")),
        Ok(NativeValue::DateTime(_))
    ));

    let time_only = bound(
        TemporalWidget::new(TemporalKind::Date),
        FieldMetadata::default().with_attribute("timeOnly", json!(true)),
        Vec::new(),
    );
    assert_eq!(time_only.input_kind(), "time");
    assert_eq!(
        time_only.from_transport(&json!("07:15")).ok(),
        NaiveTime::from_hms_opt(7, 15, 0).map(NativeValue::Time)
    );
}

#[test]
fn upload_tracker_signals_while_any_guard_is_alive() {
    let (tracker, signal) = UploadTracker::new();
    assert!(!*signal.borrow());

    let first = tracker.start();
    let second = tracker.start();
    assert!(*signal.borrow());
    assert_eq!(tracker.active(), 2);

    drop(first);
    assert!(*signal.borrow());
    drop(second);
    assert!(!*signal.borrow());
    assert_eq!(tracker.active(), 0);
}

proptest! {
    #[test]
    fn dates_survive_a_transport_round_trip(days in 1_i32..1_000_000) {
        let Some(date) = NaiveDate::from_num_days_from_ce_opt(days) else {
            return Ok(());
        };
        let widget = TemporalWidget::new(TemporalKind::Date);
        let transport = widget.to_transport(&NativeValue::Date(date));
        prop_assert!(transport.is_ok());
        let native = widget.from_transport(&transport.unwrap_or_else(|_| unreachable!()));
        prop_assert_eq!(native.ok(), Some(NativeValue::Date(date)));
    }

    #[test]
    fn instants_with_millisecond_precision_survive_a_round_trip(
        millis in -2_000_000_000_000_i64..4_000_000_000_000
    ) {
        let Some(instant) = DateTime::from_timestamp_millis(millis) else {
            return Ok(());
        };
        let widget = TemporalWidget::new(TemporalKind::DateTime);
        let transport = widget.to_transport(&NativeValue::DateTime(instant));
        prop_assert!(transport.is_ok());
        let native = widget.from_transport(&transport.unwrap_or_else(|_| unreachable!()));
        prop_assert_eq!(native.ok(), Some(NativeValue::DateTime(instant)));
    }
}
