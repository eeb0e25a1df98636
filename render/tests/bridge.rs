use autodiff::ParameterSet;
use ndarray::{ArrayD, IxDyn};
use optimization::{Optimizer, OptimizerSpec};
use render::{
    AutogradFunction, RenderArg, RenderCtx, RenderErr, Scene,
    demo::{ALBEDO_KEY, DemoScene, RADIANCE_KEY},
    render_function, render_torch,
};

const WIDTH: usize = 3;
const HEIGHT: usize = 2;

fn albedo_tensor(values: Vec<f32>) -> RenderArg {
    RenderArg::Tensor(ArrayD::from_shape_vec(IxDyn(&[HEIGHT, WIDTH, 3]), values).unwrap())
}

fn luminance_sum(scene: &DemoScene, params: &mut ParameterSet, albedo: Vec<f32>) -> f32 {
    let args = vec![
        (ALBEDO_KEY.to_string(), albedo_tensor(albedo)),
        ("pixel_format".to_string(), RenderArg::PixelFormat("y".into())),
    ];
    let (image, _) = render_torch(scene, params, args).unwrap();
    image.sum()
}

#[test]
fn test_render_torch_squeezes_single_channel() {
    let scene = DemoScene::new(WIDTH, HEIGHT, 2, 0);
    let mut params = scene.parameters();

    let args = vec![("pixel_format".to_string(), RenderArg::PixelFormat("y".into()))];
    let (image, _) = render_torch(&scene, &mut params, args).unwrap();
    assert_eq!(image.shape(), &[HEIGHT, WIDTH]);

    let args = vec![("pixel_format".to_string(), RenderArg::PixelFormat("rgb".into()))];
    let (image, _) = render_torch(&scene, &mut params, args).unwrap();
    assert_eq!(image.shape(), &[HEIGHT, WIDTH, 3]);
}

#[test]
fn test_gradients_match_finite_differences() {
    let scene = DemoScene::new(WIDTH, HEIGHT, 4, 3);
    let mut params = scene.parameters();

    let albedo: Vec<f32> = (0..WIDTH * HEIGHT * 3).map(|i| 0.1 + 0.02 * i as f32).collect();
    let args = vec![
        (ALBEDO_KEY.to_string(), albedo_tensor(albedo.clone())),
        ("spp".to_string(), RenderArg::Spp(4)),
        ("pixel_format".to_string(), RenderArg::PixelFormat("y".into())),
    ];
    let (image, mut ctx) = render_torch(&scene, &mut params, args).unwrap();

    let grad_output = ArrayD::ones(IxDyn(&[image.len()]));
    let grads = render_function()
        .backward(&mut ctx, &scene, &mut params, grad_output.view())
        .unwrap();

    assert_eq!(grads.len(), 3);
    assert!(grads[1].is_none() && grads[2].is_none());
    let grad = grads[0].as_ref().unwrap();
    assert_eq!(grad.shape(), &[HEIGHT, WIDTH, 3]);

    let eps = 0.05;
    let base = luminance_sum(&scene, &mut params, albedo.clone());
    for k in [0, 4, 8, 17] {
        let mut shifted = albedo.clone();
        shifted[k] += eps;
        let fd = (luminance_sum(&scene, &mut params, shifted) - base) / eps;
        let analytic = grad.as_slice().unwrap()[k];
        assert!((fd - analytic).abs() < 1e-3, "texel {k}: {fd} vs {analytic}");
    }
}

#[test]
fn test_backward_without_forward_fails() {
    let scene = DemoScene::new(WIDTH, HEIGHT, 1, 0);
    let mut params = scene.parameters();
    let mut ctx = RenderCtx::default();

    let grad = ArrayD::zeros(IxDyn(&[WIDTH * HEIGHT]));
    let err = render_function()
        .backward(&mut ctx, &scene, &mut params, grad.view())
        .unwrap_err();

    assert!(matches!(err, RenderErr::InvalidArgument(_)));
}

#[test]
fn test_unknown_parameter_is_reported() {
    let scene = DemoScene::new(WIDTH, HEIGHT, 1, 0);
    let mut params = scene.parameters();

    let args = vec![("/Scene/Missing/data".to_string(), albedo_tensor(vec![0.; 18]))];
    let err = render_torch(&scene, &mut params, args).unwrap_err();

    assert_eq!(err, RenderErr::UnknownParameter("/Scene/Missing/data".into()));
}

#[test]
fn test_invalid_format_leaves_parameters_untouched() {
    let scene = DemoScene::new(WIDTH, HEIGHT, 1, 0);
    let mut params = scene.parameters();
    let before = params.clone();

    let args = vec![
        (ALBEDO_KEY.to_string(), albedo_tensor(vec![1.; 18])),
        ("pixel_format".to_string(), RenderArg::PixelFormat("rgba".into())),
    ];
    let err = render_torch(&scene, &mut params, args).unwrap_err();

    assert_eq!(err, RenderErr::InvalidPixelFormat("rgba".into()));
    assert_eq!(params, before);
}

#[test]
fn test_optimization_loop_recovers_radiance() {
    let target_scene = DemoScene::with_albedo(WIDTH, HEIGHT, 2, 5, vec![0.5; 18], 2.);
    let target_params = target_scene.parameters();
    let args = || vec![("pixel_format".to_string(), RenderArg::PixelFormat("rgb".into()))];
    let (target, _) = render_torch(&target_scene, &mut target_params.clone(), args()).unwrap();

    let scene = DemoScene::new(WIDTH, HEIGHT, 2, 5);
    let spec = OptimizerSpec::Adam {
        lr: 0.05,
        beta_1: 0.9,
        beta_2: 0.999,
        epsilon: 1e-8,
    };
    let mut optimizer = spec.build(scene.parameters()).unwrap();

    let mut losses = Vec::new();
    for _ in 0..40 {
        let (image, mut ctx) = render_torch(&scene, optimizer.params_mut(), args()).unwrap();
        let diff = &image - &target;
        losses.push(diff.mapv(|d| d * d).sum());

        let grad = diff.mapv(|d| 2. * d);
        let grad = grad.into_shape_with_order(IxDyn(&[image.len()])).unwrap();
        render_function()
            .backward(&mut ctx, &scene, optimizer.params_mut(), grad.view())
            .unwrap();
        optimizer.step().unwrap();
    }

    assert!(losses[39] < losses[0] * 0.1, "{losses:?}");
    let radiance = optimizer.params().get(RADIANCE_KEY).unwrap().data()[0];
    assert!(radiance > 1.);
}
