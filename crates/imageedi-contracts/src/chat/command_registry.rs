#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

pub(crate) const RAW_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "text_model",
        action: "set_text_model",
    },
    CommandSpec {
        command: "image_model",
        action: "set_image_model",
    },
    CommandSpec {
        command: "policy",
        action: "set_reference_policy",
    },
    CommandSpec {
        command: "enhance",
        action: "enhance",
    },
    CommandSpec {
        command: "quick",
        action: "quick_action",
    },
];

pub(crate) const SINGLE_PATH_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "load",
        action: "load_image",
    },
    CommandSpec {
        command: "drop",
        action: "drop_image",
    },
    CommandSpec {
        command: "ref",
        action: "attach_reference",
    },
    CommandSpec {
        command: "save",
        action: "save_image",
    },
];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "help",
        action: "help",
    },
    CommandSpec {
        command: "clear",
        action: "clear_canvas",
    },
    CommandSpec {
        command: "detach",
        action: "detach_reference",
    },
    CommandSpec {
        command: "zoom_in",
        action: "zoom_in",
    },
    CommandSpec {
        command: "zoom_out",
        action: "zoom_out",
    },
    CommandSpec {
        command: "reset_view",
        action: "reset_view",
    },
    CommandSpec {
        command: "view",
        action: "show_view",
    },
    CommandSpec {
        command: "history",
        action: "show_history",
    },
];

pub(crate) const WHEEL_COMMAND: CommandSpec = CommandSpec {
    command: "wheel",
    action: "wheel",
};

pub(crate) const DRAG_COMMAND: CommandSpec = CommandSpec {
    command: "drag",
    action: "drag",
};

pub const CHAT_HELP_COMMANDS: &[&str] = &[
    "/load",
    "/drop",
    "/ref",
    "/detach",
    "/save",
    "/clear",
    "/enhance",
    "/quick",
    "/zoom_in",
    "/zoom_out",
    "/wheel",
    "/drag",
    "/reset_view",
    "/view",
    "/history",
    "/policy",
    "/text_model",
    "/image_model",
    "/help",
];
