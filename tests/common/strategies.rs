use proptest::prelude::*;

/// Car identifiers as the garage hands them out
pub fn car_id_strategy() -> impl Strategy<Value = String> {
    "car_[0-9]{1,3}"
}

/// Free-text problem descriptions, including quotes
pub fn problem_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z' ]{1,40}".prop_filter("problem must not be blank", |p| !p.trim().is_empty())
}

/// Number of steps in a pipeline and, optionally, the index of the one that fails
pub fn pipeline_shape_strategy() -> impl Strategy<Value = (usize, Option<usize>)> {
    (0usize..8).prop_flat_map(|len| {
        let failing = if len == 0 {
            Just(None).boxed()
        } else {
            prop::option::of(0..len).boxed()
        };
        (Just(len), failing)
    })
}

/// Workflow names accepted by the trigger, in assorted spellings
pub fn workflow_name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("check".to_string()),
        Just("CHECK".to_string()),
        Just("send_to_parking".to_string()),
        Just("send-to-parking".to_string()),
        Just("Send_For_Repair".to_string()),
    ]
}
