//! Integration tests for IPTV Core

use iptv_core::{
    loader::load_from_str, navigation, parser, Channel, EngineConfig, Error, Library,
    LoaderConfig, MemoryStore, NavigationState, PlayerConfig, PlaylistLoader, StreamKind,
};
use std::path::PathBuf;

const PLAYLIST: &str = r#"#EXTM3U x-tvg-url="http://epg.example.com/guide.xml"
#EXTINF:-1 tvg-id="bbc.uk" tvg-name="BBC" tvg-logo="http://img/bbc.png" group-title="News",BBC News
http://streams.example.com/bbc/index.m3u8
#EXTINF:-1 group-title="Sports",Sky Sports, HD
https://streams.example.com/sky/playlist.m3u8?token=abc
#EXTINF:-1 tvg-name="Music One" group-title="Music",
http://streams.example.com/music/1.ts
#EXTINF:-1,Ignored Without URL
#EXTINF:-1 group-title="News",CNN
rtmp://live.example.com/app/cnn
"#;

fn temp_file(name: &str, content: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("iptv-core-it-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

// =============================================================================
// Parser Tests
// =============================================================================

#[test]
fn test_parse_realistic_playlist() {
    let channels = parser::parse(PLAYLIST);
    let names: Vec<&str> = channels.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["BBC News", "HD", "Music One", "CNN"]);

    assert_eq!(channels[0].logo.as_deref(), Some("http://img/bbc.png"));
    assert_eq!(channels[0].group.as_deref(), Some("News"));
    assert_eq!(channels[0].stream_kind(), StreamKind::Adaptive);
    assert_eq!(channels[1].stream_kind(), StreamKind::Adaptive);
    assert_eq!(channels[2].stream_kind(), StreamKind::Direct);
    assert_eq!(channels[3].url, "rtmp://live.example.com/app/cnn");
}

#[test]
fn test_parse_header_and_groups() {
    let parsed = parser::parse_playlist(PLAYLIST);
    assert_eq!(
        parsed.epg_url.as_deref(),
        Some("http://epg.example.com/guide.xml")
    );
    assert_eq!(parser::groups(&parsed.channels), vec!["News", "Sports", "Music"]);
}

#[test]
fn test_parse_windows_line_endings() {
    let content = "#EXTM3U\r\n#EXTINF:-1,One\r\nhttp://a/1.ts\r\n\r\n#EXTINF:-1,Two\r\nhttp://a/2.ts\r\n";
    let channels = parser::parse(content);
    assert_eq!(channels.len(), 2);
    assert_eq!(channels[1].url, "http://a/2.ts");
}

// =============================================================================
// Loader Tests
// =============================================================================

#[test]
fn test_load_from_str_keeps_epg() {
    let playlist = load_from_str("Mine", PLAYLIST, None).unwrap();
    assert_eq!(playlist.len(), 4);
    assert_eq!(
        playlist.epg_url.as_deref(),
        Some("http://epg.example.com/guide.xml")
    );
}

#[tokio::test]
async fn test_load_from_file_names_playlist() {
    let path = temp_file("Family TV.m3u8", PLAYLIST);
    let loader = PlaylistLoader::new(&LoaderConfig::default()).unwrap();

    let playlist = loader.load_from_file(&path).await.unwrap();
    assert_eq!(playlist.name, "Family TV");
    assert_eq!(playlist.channels.len(), 4);
    assert!(playlist.source_url.is_none());

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[tokio::test]
async fn test_load_from_file_rejects_empty_playlist() {
    let path = temp_file("empty.m3u", "#EXTM3U\n");
    let loader = PlaylistLoader::new(&LoaderConfig::default()).unwrap();

    let err = loader.load_from_file(&path).await.unwrap_err();
    assert!(matches!(err, Error::NoChannels));
    assert!(err.is_format_error());

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[tokio::test]
async fn test_load_missing_file_is_transport_error() {
    let loader = PlaylistLoader::new(&LoaderConfig::default()).unwrap();
    let err = loader
        .load_from_file("/definitely/not/here/list.m3u")
        .await
        .unwrap_err();
    assert!(err.is_transport_error());
}

#[tokio::test]
async fn test_load_from_unreachable_url() {
    let loader = PlaylistLoader::new(&LoaderConfig::default()).unwrap();
    let err = loader
        .load_from_url("http://127.0.0.1:1/playlist.m3u")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PlaylistFetch(_)));
    assert!(err.is_transport_error());
}

// =============================================================================
// Navigation Tests
// =============================================================================

#[test]
fn test_navigation_wraps() {
    assert_eq!(navigation::next(3, Some(2)), Some(0));
    assert_eq!(navigation::previous(3, Some(0)), Some(2));
    assert_eq!(navigation::next(3, None), Some(0));
    assert_eq!(navigation::previous(3, None), Some(2));
    assert_eq!(navigation::next(0, None), None);
}

#[test]
fn test_navigation_state_follows_loaded_playlist() {
    let playlist = load_from_str("Mine", PLAYLIST, None).unwrap();
    let mut nav = NavigationState::new(playlist.channels);

    assert_eq!(nav.select(3).map(|c| c.name.as_str()), Some("CNN"));
    assert_eq!(nav.peek_next().map(|c| c.name.as_str()), Some("BBC News"));
    assert!(nav.select(4).is_none());
    assert_eq!(nav.current(), Some(3));
}

// =============================================================================
// Config and Store Tests
// =============================================================================

#[test]
fn test_player_config_defaults() {
    let config = PlayerConfig::default();
    assert!(config.preload_enabled);
    assert_eq!(config.preload_delay_ms, 2000);
    assert_eq!(config.failure_advance_delay_ms, 3000);
    assert_eq!(config.engine.max_buffer_length, EngineConfig::default().max_buffer_length);
    assert!(config.validate().is_ok());
}

#[test]
fn test_library_remembers_last_channel() {
    let playlist = load_from_str("Mine", PLAYLIST, None).unwrap();
    let mut library = Library::new(MemoryStore::new());

    library.save_playlists(std::slice::from_ref(&playlist)).unwrap();
    library.save_last_channel(&playlist.id, 2).unwrap();

    let (restored, index) = library.resume_point().unwrap();
    assert_eq!(restored.id, playlist.id);
    let channel: &Channel = &restored.channels[index];
    assert_eq!(channel.name, "Music One");

    library.save_last_channel(&playlist.id, restored.len()).unwrap();
    assert!(library.resume_point().is_none());
}
