use expansion::{
    imgdata::{HeatMap, RenderConfig},
    model::{Model, SimConfig},
};

use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    // Size of the (square) grid
    let grid_size = 100;

    // # of iterations to go through
    let n_iterations = 5000;

    let config = SimConfig {
        grid_size,
        iterations: n_iterations,
        show_progress: true,
        ..SimConfig::default()
    };

    let mut model = Model::new(config)?; // Create the model

    model.print_configurations(); // Print config for model

    model.run_configured(); // Actually run the model

    println!("{}", model.summary());

    println!("Rendering heat map....");
    let heatmap = HeatMap::from_grid(model.grid(), RenderConfig::default())?;
    println!("{}", heatmap.title);
    heatmap.save("expansion.png")?;
    println!("Done!");
    Ok(())
}
