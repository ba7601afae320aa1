//! Reshape store records into the JSON views clients render.

use chrono::{DateTime, Local, Utc};
use parley_shared::constants::file_url;
use parley_shared::protocol::{
    ChannelView, DmChannelView, DmPairView, FileView, MessageView, ReactionView,
    ThreadMessageView, UserView,
};
use parley_store::{Channel, DmPair, FileRecord, MessageDetails, Reaction, ReplyDetails, User};

/// Server-local wall-clock time, e.g. `3:07:42 PM`.
pub fn display_time(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%-I:%M:%S %p").to_string()
}

pub fn file_view(file: FileRecord) -> FileView {
    FileView {
        url: file_url(file.id),
        id: file.id,
        name: file.name,
        mime_type: file.mime_type,
    }
}

pub fn message_view(details: MessageDetails) -> MessageView {
    MessageView {
        id: details.message.id,
        user: details.author_name,
        user_image: details.author_image,
        timestamp: display_time(&details.message.timestamp),
        content: details.message.content,
        reactions: details.reactions,
        reply_count: details.reply_count,
        file: details.file.map(file_view),
    }
}

pub fn thread_message_view(details: ReplyDetails) -> ThreadMessageView {
    ThreadMessageView {
        id: details.reply.id,
        user: details.author_name,
        timestamp: display_time(&details.reply.timestamp),
        content: details.reply.content,
        file: details.file.map(file_view),
    }
}

pub fn user_view(user: User) -> UserView {
    UserView {
        id: user.id,
        name: user.name,
        status: user.status,
        status_message: user.status_message,
        profile_image: user.profile_image,
    }
}

pub fn channel_view(channel: Channel) -> ChannelView {
    ChannelView {
        id: channel.id,
        name: channel.name,
    }
}

pub fn dm_pair_view(pair: DmPair) -> DmPairView {
    DmPairView {
        id: pair.channel_id,
        user_name: pair.other_name,
    }
}

pub fn dm_channel_view(pair: DmPair) -> DmChannelView {
    DmChannelView {
        id: pair.channel_id,
        name: pair.channel_name,
        user_name: pair.other_name,
    }
}

pub fn reaction_view(reaction: Reaction) -> ReactionView {
    ReactionView {
        id: reaction.id,
        message_id: reaction.message_id,
        user_id: reaction.user_id,
        emoji: reaction.emoji,
    }
}
