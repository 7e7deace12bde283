use approx::assert_abs_diff_eq;
use gpkern::{
    HyperValue, KernelBlock, KernelError, KernelParams, KernelSpec, parse_kernel_spec,
    prepare_kernels, spec_to_theta, theta_to_spec,
};
use serde_json::json;

fn mixed_spec() -> KernelSpec {
    let mut spec = KernelSpec::new();

    let mut gaussian = KernelBlock::new(KernelParams::Gaussian {
        width: HyperValue::Scalar(0.5),
    });
    gaussian.scaling = Some(1.0);
    spec.push("g", gaussian);

    spec.push("lin", KernelBlock::new(KernelParams::Linear));
    spec.push(
        "c",
        KernelBlock::new(KernelParams::Constant { value: 2.0 }),
    );
    spec.push(
        "q",
        KernelBlock::new(KernelParams::Quadratic {
            slope: HyperValue::Scalar(1.0),
            degree: 2.0,
        }),
    );
    spec
}

#[test]
fn normalize_encode_decode_is_an_identity_on_the_spec() {
    let ambient = 3usize;
    let mut spec = mixed_spec();
    let bounds = prepare_kernels(&mut spec, (1e-3, 1e3), false, ambient).expect("normalize");

    // scaling + 3 width + 1 const + 3 slope + 1 degree + regularization
    assert_eq!(bounds.len(), 10);
    assert_eq!(bounds[9], (1e-3, 1e3));

    let flat = spec_to_theta(&spec, Some(ambient)).expect("encode");
    assert_eq!(flat.len(), 9);
    assert_abs_diff_eq!(flat[0], 1.0);
    assert_abs_diff_eq!(flat[4], 2.0);

    let mut decoded = spec.clone();
    theta_to_spec(flat.view(), &mut decoded).expect("decode");
    assert_eq!(decoded, spec);
}

#[test]
fn optimizer_iteration_updates_flow_back_into_the_spec() {
    let ambient = 2usize;
    let mut spec = mixed_spec();
    let bounds = prepare_kernels(&mut spec, (1e-6, 1e2), false, ambient).expect("normalize");
    let flat = spec_to_theta(&spec, Some(ambient)).expect("encode");

    // The kernel-derived segment is one shorter than the bound list, which
    // carries the trailing regularization pair.
    assert_eq!(flat.len() + 1, bounds.len());

    // Simulate one optimizer step proposing new values, regularization last.
    let mut proposed: Vec<f64> = flat.iter().map(|v| v * 1.5 + 0.1).collect();
    proposed.push(0.007);
    theta_to_spec(ndarray::Array1::from_vec(proposed.clone()).view(), &mut spec)
        .expect("decode proposal");

    assert_abs_diff_eq!(spec.get("g").unwrap().scaling.unwrap(), proposed[0]);
    match &spec.get("q").unwrap().params {
        KernelParams::Quadratic { degree, .. } => {
            // last kernel-derived element; the trailing 0.007 is untouched
            assert_abs_diff_eq!(*degree, proposed[flat.len() - 1]);
        }
        other => panic!("unexpected params: {other:?}"),
    }
}

#[test]
fn json_config_drives_the_full_pipeline() {
    let raw = json!({
        "k1": {"type": "gaussian", "width": 0.5},
        "k2": {"type": "constant", "const": 1.0},
    });
    let mut spec = parse_kernel_spec(&raw).expect("parse");
    let bounds = prepare_kernels(&mut spec, (0.0, 1.0), false, 3).expect("normalize");
    assert_eq!(bounds.len(), 5);

    let flat = spec_to_theta(&spec, Some(3)).expect("encode");
    assert_eq!(flat.to_vec(), vec![0.5, 0.5, 0.5, 1.0]);
}

#[test]
fn linear_blocks_are_transparent_to_bounds_and_vector() {
    let raw = json!({"only": {"type": "linear"}});
    let mut spec = parse_kernel_spec(&raw).expect("parse");
    let bounds = prepare_kernels(&mut spec, (0.0, 1.0), false, 4).expect("normalize");
    assert_eq!(bounds, vec![(0.0, 1.0)]);

    let flat = spec_to_theta(&spec, Some(4)).expect("encode");
    assert!(flat.is_empty());
}

#[test]
fn malformed_configs_fail_fast_with_named_offenders() {
    let err = parse_kernel_spec(&json!({"k": {"type": "gaussian"}})).expect_err("no width");
    assert!(err.to_string().contains("width"));

    let err = parse_kernel_spec(&json!({"k": {"type": "gaussian", "width": 1.0, "bogus": 5}}))
        .expect_err("undefined key");
    assert!(err.to_string().contains("bogus"));
    assert!(err.to_string().contains("gaussian"));

    let err = parse_kernel_spec(&json!({"k": {"type": "rbf_unknown"}})).expect_err("unknown");
    assert_eq!(err, KernelError::UnsupportedKernel("rbf_unknown".to_string()));
}

#[test]
fn validated_spec_round_trips_through_json() {
    let mut spec = mixed_spec();
    prepare_kernels(&mut spec, (0.0, 1.0), false, 2).expect("normalize");

    let payload = serde_json::to_string(&spec).expect("serialize");
    let restored: KernelSpec = serde_json::from_str(&payload).expect("deserialize");
    assert_eq!(restored, spec);
}
