mod chat_dto;

pub use chat_dto::{
    ChatQuery, DeleteChatResponseDto, RenameChatDto, RenameChatForm, RenameChatResponseDto,
    SendMessageDto, SendMessageResponseDto,
};
