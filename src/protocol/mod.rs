//! Protocol Module
//!
//! The MMP wire protocol: typed objects, a resumable parser, a writer and
//! the command model layered on top.
//!
//! ## Object Format
//! Every object starts with its tag byte. Integers are little-endian and
//! `\n` is the separator.
//!
//! ```text
//! String   $<utf8 text>\n
//! Blob     B<len:i32>\n<bytes>\n
//! Error    !<len:i32>\n<code:8 ascii, blank padded>\n<utf8 message>\n
//! Integer  I<i32>\n
//! Long     L<i64>\n
//! Double   D<f64>\n
//! Null     N\n
//! Boolean  1\n or 0\n
//! Array    *<count:i32>\n<items>
//! Map      %<count:i32>\n<key><value>...
//! ```
//!
//! ## Commands
//! A request is an array whose first item is the keyword string:
//! `*<n>\n$SET\n$key\nB...`. Pipelined requests are concatenated arrays and
//! the response carries one object per request, in request order.

mod codec;
mod command;
mod object;
mod parser;
mod response;
mod token;
mod writer;

pub use codec::{read_batch, read_objects, write_object};
pub use command::{decode_commands, Command};
pub use object::ProtocolObject;
pub use parser::{parse, Parser, DEFAULT_MAX_FRAME_SIZE, DEFAULT_MAX_NESTING_DEPTH};
pub use response::{
    WireError, ARGUMENT_ERROR_CODE, SYNTAX_ERROR_CODE, UNKNOWN_COMMAND_CODE,
};
pub use token::{TokenType, ERROR_CODE_LEN, SEPARATOR};
pub use writer::{
    encode, encode_into, ArrayBuilder, ItemWriter, MapBuilder, Mark, MessageBuffer,
    ObjectWriter, StreamWriter,
};
