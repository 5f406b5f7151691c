pub mod app {
    pub mod config;
    pub mod multicast;
    pub mod scenario;
}

pub mod cli;

pub mod controllers {
    pub mod bottom_sheet;
    pub mod photo_list;
}

pub mod host {
    pub mod scroll_view;
}

pub mod protocol {
    pub mod scroll_view_delegate;
}
