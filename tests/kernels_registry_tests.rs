use sdrpipe::core::{SampleFormat, StageError};
use sdrpipe::registry::{self, KernelParams};

fn params(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[test]
fn test_bundled_kernels_registered() {
    let names: Vec<&str> = registry::all().iter().map(|d| d.name).collect();
    for expected in [
        "add_const_cc",
        "convert_f_s16",
        "convert_f_s8",
        "convert_f_u8",
        "convert_s16_f",
        "convert_s8_f",
        "convert_u8_f",
        "fft_cc",
        "fir_decimate_cc",
        "gain_ff",
        "limit_ff",
        "realpart_cf",
        "shift_math_cc",
    ] {
        assert!(names.contains(&expected), "{} not registered", expected);
    }

    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
}

#[test]
fn test_lookup_unknown_is_none() {
    assert!(registry::lookup("no_such_kernel").is_none());
}

#[test]
fn test_descriptor_formats_match_instance() {
    let descriptor = registry::lookup("realpart_cf").unwrap();
    assert_eq!(descriptor.input, SampleFormat::ComplexF32);
    assert_eq!(descriptor.output, SampleFormat::F32);
    assert!(!descriptor.accepts_control());

    let kernel = descriptor.create(&KernelParams::new(descriptor.name, &[])).unwrap();
    assert_eq!(kernel.input_format(), descriptor.input);
    assert_eq!(kernel.output_format(), descriptor.output);
}

#[test]
fn test_control_field_counts() {
    assert_eq!(registry::lookup("gain_ff").unwrap().control, 1);
    assert_eq!(registry::lookup("add_const_cc").unwrap().control, 2);
    assert_eq!(registry::lookup("shift_math_cc").unwrap().control, 1);
    assert_eq!(registry::lookup("fft_cc").unwrap().control, 0);
}

#[test]
fn test_missing_required_parameter_is_usage() {
    let descriptor = registry::lookup("gain_ff").unwrap();
    let err = descriptor.create(&KernelParams::new("gain_ff", &[])).err().unwrap();
    assert!(matches!(err, StageError::Usage(_)));
    assert_eq!(err.exit_code(), -1);
}

#[test]
fn test_bad_fft_size_is_invalid_parameter() {
    let descriptor = registry::lookup("fft_cc").unwrap();
    let values = params(&["1000", "100"]);
    let err = descriptor.create(&KernelParams::new("fft_cc", &values)).err().unwrap();
    assert!(matches!(err, StageError::InvalidParameter(_)));

    let values = params(&["1024", "512", "TRIANGLE"]);
    assert!(descriptor.create(&KernelParams::new("fft_cc", &values)).is_err());
}

#[test]
fn test_descriptor_json_shape() {
    let descriptor = registry::lookup("fft_cc").unwrap();
    let json = serde_json::to_value(descriptor).unwrap();

    assert_eq!(json["name"], "fft_cc");
    assert_eq!(json["input"], "complex_f32");
    assert_eq!(json["control"], 0);
    assert!(json.get("factory").is_none());

    let parameters = json["parameters"].as_array().unwrap();
    assert_eq!(parameters.len(), 3);
    assert_eq!(parameters[0]["type"], "int");
    assert!(parameters[0].get("default").is_none());
    assert_eq!(parameters[2]["default"], "BLACKMAN");
}
