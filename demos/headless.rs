//! Plays a file without any UI, logging every refresh the player publishes.
//!
//! `RUST_LOG=info cargo run --example headless -- path/to/clip.mp4 [video-sink]`

use video_player_engine::{MainLoopPlayer, Observers, Settings};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: headless <file> [video-sink]");
        std::process::exit(2);
    };
    let video_sink = args.next().unwrap_or_else(|| String::from("autovideosink"));
    let uri = url::Url::from_file_path(std::fs::canonicalize(&path)?)
        .map_err(|_| format!("cannot turn {path} into a file uri"))?;

    let main_loop = glib::MainLoop::new(None, false);
    let at_end = main_loop.clone();
    let on_error = main_loop.clone();

    let observers = Observers::new()
        .on_duration_changed(|duration| log::info!("duration: {duration}"))
        .on_position_changed(move |position, progress| {
            log::debug!("position: {position} ({:.1}%)", progress * 100.0);
            if progress >= 1.0 {
                at_end.quit();
            }
        })
        .on_thumbnail_ready(|path| log::info!("thumbnail ready: {}", path.display()))
        .on_playback_error(move |message| {
            log::error!("playback error: {message}");
            on_error.quit();
        });

    let settings = Settings::default().video_sink(video_sink);
    log::info!("thumbnails go to {}", settings.thumbnail_file().display());
    let player = MainLoopPlayer::new(settings, observers)?;
    player.open_file(&uri)?;
    main_loop.run();

    player.shutdown();
    Ok(())
}
