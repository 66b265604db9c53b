pub mod narrate_clip_use_case;
