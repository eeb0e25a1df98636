use std::env;

use anyhow::Result;
use log::{debug, info};
use optimization::Optimizer;
use render::{
    AutogradFunction, RenderArg, Scene,
    demo::{DemoScene, RADIANCE_KEY},
    render_function, render_torch,
};

mod config;

use config::RunConfig;

/// Albedo of the scene to recover: a two tone checkerboard.
fn checkerboard(width: usize, height: usize) -> Vec<f32> {
    (0..width * height)
        .flat_map(|i| {
            let (x, y) = (i % width, i / width);
            if (x / 2 + y / 2) % 2 == 0 {
                [0.8, 0.3, 0.2]
            } else {
                [0.2, 0.6, 0.9]
            }
        })
        .collect()
}

fn main() -> Result<()> {
    env_logger::init();

    let config = match env::args().nth(1) {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    info!("running with {config:?}");

    let RunConfig {
        optimizer,
        iterations,
        spp,
        pixel_format,
        width,
        height,
        seed,
        accumulate,
    } = config;

    let args = || {
        vec![
            ("spp".to_string(), RenderArg::Spp(spp)),
            ("pixel_format".to_string(), RenderArg::PixelFormat(pixel_format.to_string())),
        ]
    };

    let reference = DemoScene::with_albedo(width, height, spp, seed, checkerboard(width, height), 1.);
    let (target, _) = render_torch(&reference, &mut reference.parameters(), args())?;

    let scene = DemoScene::new(width, height, spp, seed);
    let mut optimizer = optimizer.build(scene.parameters())?;
    info!("optimizer {optimizer}");

    let substeps = accumulate.map_or(1, |n| n.get());
    for it in 0..iterations {
        let mut loss = 0.;

        for _ in 0..substeps {
            let (image, mut ctx) = render_torch(&scene, optimizer.params_mut(), args())?;
            let diff = &image - &target;
            loss += diff.mapv(|d| d * d).sum() / substeps as f32;

            let grad = diff.mapv(|d| 2. * d);
            let grad = grad.view().into_shape_with_order(image.len())?.into_dyn();
            render_function().backward(&mut ctx, &scene, optimizer.params_mut(), grad)?;

            if accumulate.is_some() {
                optimizer.accumulate_gradients()?;
                optimizer.params_mut().clear_grads();
            }
        }

        optimizer.step()?;
        debug!(iteration = it, loss = loss; "optimizer step");
        if it % 10 == 0 || it + 1 == iterations {
            info!("iteration {it}: loss {loss:.6}");
        }
    }

    let radiance = optimizer
        .params()
        .get(RADIANCE_KEY)
        .map_or(f32::NAN, |v| v.data()[0]);
    info!("done, recovered radiance {radiance:.4}");

    Ok(())
}
