use hwconf::config::load_board_dir;
use hwconf::{default_registry, init_tracing, run_board};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    init_tracing();

    // Get config path (board default or override)
    let config_path = hwconf_rpi_pico_w::get_config_path();

    tracing::info!(
        "[{}] Board directory: {}",
        hwconf_rpi_pico_w::BOARD_NAME,
        config_path.display()
    );

    // Catalog and ports from CONFIG_PATH or built in, plus this board
    let mut registry = default_registry()?;
    registry.add_board(load_board_dir(&config_path)?)?;

    // Validate and bring the board up on the dry-run HAL
    run_board(&registry, hwconf_rpi_pico_w::BOARD_ID).await?;
    Ok(())
}
